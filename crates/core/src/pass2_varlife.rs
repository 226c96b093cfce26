//! Pass 2: generics liveness (VarLife).
//!
//! Decides, for every step of a generic goal, which type variables the
//! step's method introduces and which ones the step's interface type has
//! to carry because they were bound earlier and are still needed.
//!
//! Steps are processed left to right with a `bound` set that starts with
//! the receiver's variables (instance and bean goals). For step `i`:
//!
//! - `method_params[i]`: variables of the step type not yet bound. They
//!   are introduced here, on the method, so the call site infers them.
//! - `type_params[i]`: variables bound before step `i` that step `i`, a
//!   later step, or the terminal contract still needs.
//!
//! A variable is therefore introduced at the latest possible step (the
//! first one whose parameter mentions it) and never twice. Variables only
//! the terminal contract mentions are introduced on the terminal method.

use crate::error::{GoalError, StructuralError};
use crate::goal::GoalDescription;
use crate::pass1_sequence::StepOrder;
use crate::types::{TypeRef, TypeVar};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepVars {
    pub method_params: Vec<TypeVar>,
    pub type_params: Vec<TypeVar>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VarLifeTable {
    /// Variables bound by the receiver before any step runs.
    pub receiver_params: Vec<TypeVar>,
    pub steps: Vec<StepVars>,
    /// Bound variables the terminal contract's type carries.
    pub terminal_type_params: Vec<TypeVar>,
    /// Variables only the terminal contract mentions.
    pub terminal_method_params: Vec<TypeVar>,
}

impl VarLifeTable {
    pub fn method_params(&self, step: usize) -> &[TypeVar] {
        &self.steps[step].method_params
    }

    pub fn type_params(&self, step: usize) -> &[TypeVar] {
        &self.steps[step].type_params
    }

    /// Everything bound before `step` runs (receiver variables plus every
    /// earlier method introduction), in introduction order. `step ==
    /// steps.len()` gives the set bound when the terminal contract is
    /// reached.
    pub fn bound_before(&self, step: usize) -> Vec<TypeVar> {
        let mut bound = self.receiver_params.clone();
        for vars in self.steps.iter().take(step) {
            bound.extend(vars.method_params.iter().cloned());
        }
        bound
    }
}

/// Run the liveness analysis.
///
/// `step_types` are the parameter types in step order; `terminal_types`
/// are the result and error types of the target operation;
/// `instance_type_parameters` is `Some` for goals whose receiver binds
/// variables up front.
pub fn analyze(
    declared: &[TypeVar],
    step_types: &[TypeRef],
    terminal_types: &[TypeRef],
    instance_type_parameters: Option<&[TypeVar]>,
) -> Result<VarLifeTable, GoalError> {
    let receiver: Vec<TypeVar> = instance_type_parameters.unwrap_or(&[]).to_vec();
    for var in &receiver {
        if !declared.contains(var) {
            return Err(StructuralError::UndeclaredInstanceParameter {
                var: var.to_string(),
            }
            .into());
        }
    }

    for ty in step_types.iter().chain(terminal_types) {
        if let Some(var) = ty.type_vars().into_iter().find(|v| !declared.contains(v)) {
            return Err(GoalError::generics(
                &var,
                format!("'{}' mentions it, but the goal does not declare it", ty),
            ));
        }
    }

    let terminal_vars: BTreeSet<TypeVar> = terminal_types.iter().flat_map(TypeRef::type_vars).collect();

    // needed_from[i]: every variable step i.. or the terminal mentions
    let mut needed_from: Vec<BTreeSet<TypeVar>> = vec![BTreeSet::new(); step_types.len() + 1];
    needed_from[step_types.len()] = terminal_vars.clone();
    for (i, ty) in step_types.iter().enumerate().rev() {
        let mut needed = needed_from[i + 1].clone();
        needed.extend(ty.type_vars());
        needed_from[i] = needed;
    }

    let mut bound: BTreeSet<TypeVar> = receiver.iter().cloned().collect();
    let mut steps = Vec::with_capacity(step_types.len());

    for (i, ty) in step_types.iter().enumerate() {
        let free: BTreeSet<TypeVar> = ty
            .type_vars()
            .into_iter()
            .filter(|v| !bound.contains(v))
            .collect();
        let live: BTreeSet<TypeVar> = bound.intersection(&needed_from[i]).cloned().collect();

        let vars = StepVars {
            method_params: in_declaration_order(declared, &free),
            type_params: in_declaration_order(declared, &live),
        };
        tracing::trace!(
            step = i,
            method = ?vars.method_params,
            carried = ?vars.type_params,
            "varlife"
        );
        steps.push(vars);
        bound.extend(free);
    }

    for var in declared {
        if !bound.contains(var) && !terminal_vars.contains(var) {
            return Err(GoalError::generics(
                var,
                "it occurs in no parameter, receiver, result or error type",
            ));
        }
    }

    let terminal_bound: BTreeSet<TypeVar> = bound.intersection(&terminal_vars).cloned().collect();
    let terminal_free: BTreeSet<TypeVar> = terminal_vars.difference(&bound).cloned().collect();

    Ok(VarLifeTable {
        receiver_params: receiver,
        steps,
        terminal_type_params: in_declaration_order(declared, &terminal_bound),
        terminal_method_params: in_declaration_order(declared, &terminal_free),
    })
}

/// Liveness for a goal whose steps were ordered by pass 1.
pub fn analyze_goal(goal: &GoalDescription, order: &StepOrder) -> Result<VarLifeTable, GoalError> {
    let details = goal.details();
    let step_types: Vec<TypeRef> = order
        .apply(goal.parameters())
        .into_iter()
        .map(|p| p.ty().clone())
        .collect();
    // The receiver binds exactly the variables its type mentions.
    if let Some(binds) = details.receiver_type_parameters() {
        let receiver = &details.declaring_type;
        if let Some(var) = receiver.type_vars().into_iter().find(|v| !binds.contains(v)) {
            return Err(GoalError::generics(
                &var,
                format!("receiver type '{}' mentions it but does not bind it", receiver),
            ));
        }
        if let Some(var) = binds.iter().find(|v| !receiver.mentions(v)) {
            return Err(GoalError::generics(
                var,
                format!("it is bound by the receiver, but '{}' does not mention it", receiver),
            ));
        }
    }
    analyze(
        &details.type_parameters,
        &step_types,
        &details.terminal_types(),
        details.receiver_type_parameters(),
    )
}

fn in_declaration_order(declared: &[TypeVar], set: &BTreeSet<TypeVar>) -> Vec<TypeVar> {
    declared.iter().filter(|v| set.contains(*v)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::vars;

    fn parse_all(texts: &[&str], declared: &[TypeVar]) -> Vec<TypeRef> {
        texts
            .iter()
            .map(|t| TypeRef::parse(t, declared).unwrap())
            .collect()
    }

    #[test]
    fn test_worked_example() {
        let declared = vars(["K", "V"]);
        let steps = parse_all(&["List<K>", "V", "Map<K, V>"], &declared);
        let table = analyze(&declared, &steps, &[], None).unwrap();

        let method: Vec<Vec<TypeVar>> = table.steps.iter().map(|s| s.method_params.clone()).collect();
        let carried: Vec<Vec<TypeVar>> = table.steps.iter().map(|s| s.type_params.clone()).collect();
        assert_eq!(method, vec![vars(["K"]), vars(["V"]), vec![]]);
        assert_eq!(carried, vec![vec![], vars(["K"]), vars(["K", "V"])]);
    }

    #[test]
    fn test_variable_dropped_once_no_longer_needed() {
        let declared = vars(["K"]);
        let steps = parse_all(&["K", "String", "u8"], &declared);
        let table = analyze(&declared, &steps, &[TypeRef::simple("Out")], None).unwrap();
        assert_eq!(table.type_params(1), &[] as &[TypeVar]);
        assert_eq!(table.bound_before(2), vars(["K"]));
    }

    #[test]
    fn test_terminal_keeps_variables_alive() {
        let declared = vars(["K"]);
        let steps = parse_all(&["K", "String"], &declared);
        let result = parse_all(&["Out<K>"], &declared);
        let table = analyze(&declared, &steps, &result, None).unwrap();
        assert_eq!(table.type_params(1), vars(["K"]).as_slice());
        assert_eq!(table.terminal_type_params, vars(["K"]));
        assert!(table.terminal_method_params.is_empty());
    }

    #[test]
    fn test_return_only_variable_bound_at_terminal() {
        let declared = vars(["T"]);
        let steps = parse_all(&["usize"], &declared);
        let result = parse_all(&["Vec<T>"], &declared);
        let table = analyze(&declared, &steps, &result, None).unwrap();
        assert!(table.method_params(0).is_empty());
        assert!(table.type_params(0).is_empty());
        assert_eq!(table.terminal_method_params, vars(["T"]));
    }

    #[test]
    fn test_instance_variables_bound_before_first_step() {
        let declared = vars(["K", "V"]);
        let steps = parse_all(&["K", "V"], &declared);
        let receiver = vars(["K"]);
        let table = analyze(&declared, &steps, &[], Some(&receiver)).unwrap();
        assert!(table.method_params(0).is_empty());
        assert_eq!(table.type_params(0), vars(["K"]).as_slice());
        assert_eq!(table.method_params(1), vars(["V"]).as_slice());
        assert!(table.type_params(1).is_empty());
    }

    #[test]
    fn test_undeclared_variable_is_unsatisfiable() {
        let declared = vars(["K"]);
        let steps = vec![TypeRef::var("Q")];
        let err = analyze(&declared, &steps, &[], None).unwrap_err();
        assert_eq!(err.kind(), "generics");
        assert!(err.to_string().contains("'Q'"));
    }

    #[test]
    fn test_unreachable_declared_variable_is_unsatisfiable() {
        let declared = vars(["K", "Unused"]);
        let steps = parse_all(&["K"], &declared);
        let err = analyze(&declared, &steps, &[], None).unwrap_err();
        assert!(matches!(err, GoalError::GenericsUnsatisfiable { ref var, .. } if var == "Unused"));
    }

    #[test]
    fn test_receiver_binds_otherwise_unused_variable() {
        let declared = vars(["K"]);
        let receiver = vars(["K"]);
        let table = analyze(&declared, &[TypeRef::simple("u8")], &[], Some(&receiver)).unwrap();
        assert!(table.type_params(0).is_empty());
    }

    #[test]
    fn test_non_generic_goal_has_empty_table() {
        let steps = parse_all(&["String", "u32"], &[]);
        let table = analyze(&[], &steps, &[TypeRef::simple("Person")], None).unwrap();
        assert!(table
            .steps
            .iter()
            .all(|s| s.method_params.is_empty() && s.type_params.is_empty()));
    }

    #[test]
    fn test_sets_follow_declaration_order() {
        let declared = vars(["B", "A"]);
        let steps = parse_all(&["(A, B)"], &declared);
        let table = analyze(&declared, &steps, &[], None).unwrap();
        assert_eq!(table.method_params(0), vars(["B", "A"]).as_slice());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    const NAMES: [&str; 4] = ["A", "B", "C", "D"];

    fn declared() -> Vec<TypeVar> {
        NAMES.iter().map(|n| TypeVar::new(*n)).collect()
    }

    /// A step type mentioning a subset of the four variables.
    fn arb_step_type() -> impl Strategy<Value = TypeRef> {
        prop::collection::vec(prop::bool::ANY, 4).prop_map(|mask| {
            let args: Vec<TypeRef> = mask
                .iter()
                .zip(NAMES)
                .filter(|(on, _)| **on)
                .map(|(_, n)| TypeRef::var(n))
                .collect();
            if args.is_empty() {
                TypeRef::simple("u64")
            } else {
                TypeRef::named("Slot", args)
            }
        })
    }

    fn arb_goal() -> impl Strategy<Value = (Vec<TypeRef>, Vec<TypeRef>)> {
        (
            prop::collection::vec(arb_step_type(), 0..6),
            prop::collection::vec(arb_step_type(), 1..2),
        )
    }

    /// Keep only declared variables that something mentions, so the
    /// analysis never rejects the input.
    fn reachable(steps: &[TypeRef], terminal: &[TypeRef]) -> Vec<TypeVar> {
        declared()
            .into_iter()
            .filter(|v| steps.iter().chain(terminal).any(|t| t.mentions(v)))
            .collect()
    }

    proptest! {
        #[test]
        fn liveness_soundness((steps, terminal) in arb_goal()) {
            let declared = reachable(&steps, &terminal);
            let table = analyze(&declared, &steps, &terminal, None).unwrap();
            for (i, ty) in steps.iter().enumerate() {
                let before = table.bound_before(i);
                for var in ty.type_vars() {
                    prop_assert!(
                        table.method_params(i).contains(&var) || before.contains(&var),
                        "step {} needs {} but it is unbound", i, var
                    );
                }
            }
        }

        #[test]
        fn liveness_minimality((steps, terminal) in arb_goal()) {
            let declared = reachable(&steps, &terminal);
            let table = analyze(&declared, &steps, &terminal, None).unwrap();
            for i in 0..steps.len() {
                for var in table.type_params(i) {
                    let needed = steps[i..].iter().chain(&terminal).any(|t| t.mentions(var));
                    prop_assert!(needed, "step {} carries {} needlessly", i, var);
                }
            }
        }

        #[test]
        fn variables_introduced_once((steps, terminal) in arb_goal()) {
            let declared = reachable(&steps, &terminal);
            let table = analyze(&declared, &steps, &terminal, None).unwrap();
            let mut introduced: Vec<TypeVar> = table
                .steps
                .iter()
                .flat_map(|s| s.method_params.iter().cloned())
                .chain(table.terminal_method_params.iter().cloned())
                .collect();
            let total = introduced.len();
            introduced.sort();
            introduced.dedup();
            prop_assert_eq!(total, introduced.len());
            prop_assert_eq!(total, declared.len());
        }

        #[test]
        fn analysis_is_deterministic((steps, terminal) in arb_goal()) {
            let declared = reachable(&steps, &terminal);
            let first = analyze(&declared, &steps, &terminal, None).unwrap();
            let second = analyze(&declared, &steps, &terminal, None).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
