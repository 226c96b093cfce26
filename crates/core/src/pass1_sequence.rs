//! Pass 1: step sequencing -- turn per-parameter position hints into a
//! total step order.
//!
//! Absolute positions are placed first and must not collide. The free
//! slots are then filled left to right: floated parameters (stable by
//! group key, absent key = group 0) before everything else, each group
//! in declaration order.

use crate::error::StructuralError;
use crate::parameter::{Parameter, PositionHint};
use serde::Serialize;

/// A permutation of parameter indices: `indices()[k]` is the parameter
/// consumed by step `k`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StepOrder(Vec<usize>);

impl StepOrder {
    pub fn identity(len: usize) -> Self {
        StepOrder((0..len).collect())
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parameters in step order.
    pub fn apply<'a, T>(&self, items: &'a [T]) -> Vec<&'a T> {
        self.0.iter().map(|&i| &items[i]).collect()
    }
}

pub fn sequence(
    parameters: &[Parameter],
    hints: &[PositionHint],
) -> Result<StepOrder, StructuralError> {
    if hints.len() != parameters.len() {
        return Err(StructuralError::HintCountMismatch {
            parameters: parameters.len(),
            hints: hints.len(),
        });
    }

    let count = parameters.len();
    let mut slots: Vec<Option<usize>> = vec![None; count];

    for (index, hint) in hints.iter().enumerate() {
        if let PositionHint::Absolute { position } = *hint {
            if position >= count {
                return Err(StructuralError::PositionOutOfRange {
                    name: parameters[index].name().to_string(),
                    position,
                    count,
                });
            }
            if let Some(first) = slots[position] {
                return Err(StructuralError::ConflictingPosition {
                    position,
                    first: parameters[first].name().to_string(),
                    second: parameters[index].name().to_string(),
                });
            }
            slots[position] = Some(index);
        }
    }

    let mut floated: Vec<(i32, usize)> = hints
        .iter()
        .enumerate()
        .filter_map(|(index, hint)| match hint {
            PositionHint::FloatLeft { group } => Some((group.unwrap_or(0), index)),
            _ => None,
        })
        .collect();
    // sort_by_key is stable: ties keep declaration order
    floated.sort_by_key(|&(group, _)| group);

    let declared = hints
        .iter()
        .enumerate()
        .filter(|(_, hint)| matches!(hint, PositionHint::Declared))
        .map(|(index, _)| index);

    let mut remaining = floated.into_iter().map(|(_, index)| index).chain(declared);
    for slot in slots.iter_mut().filter(|s| s.is_none()) {
        *slot = remaining.next();
    }

    let order: Vec<usize> = slots.into_iter().flatten().collect();
    tracing::trace!(?order, "step order");
    Ok(StepOrder(order))
}
