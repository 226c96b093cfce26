//! Three-pass generator: GoalDescription -> SynthesizedGoal.
//!
//! Thin orchestrator over the pass modules. Goals are independent, so a
//! batch is processed in parallel; results keep input order.

use crate::error::{GoalError, StructuralError};
use crate::goal::GoalDescription;
use crate::pass1_sequence;
use crate::pass2_varlife;
use crate::pass3_synthesize::{self, SynthesizedGoal};
use crate::report::{self, BatchReport};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// Run every pass for one goal.
pub fn generate_goal(goal: &GoalDescription) -> Result<SynthesizedGoal, GoalError> {
    let span = tracing::debug_span!("goal", id = goal.id());
    let _enter = span.enter();

    // Pass 1: step order
    let order = pass1_sequence::sequence(goal.parameters(), &goal.position_hints())?;

    // Pass 2: generics liveness
    let varlife = pass2_varlife::analyze_goal(goal, &order)?;

    // Pass 3: interface graph
    let synthesized = pass3_synthesize::synthesize(goal, &order, &varlife)?;
    tracing::debug!(goal = %synthesized.goal_name, steps = order.len(), "synthesized");
    Ok(synthesized)
}

/// Generate a batch. One goal's failure never affects another's output;
/// a goal whose generated names collide with an earlier goal's, or with
/// each other, is reported and dropped.
pub fn generate_batch(goals: &[GoalDescription]) -> BatchReport {
    let results: Vec<Result<SynthesizedGoal, GoalError>> =
        goals.par_iter().map(generate_goal).collect();

    let mut report = BatchReport::new();
    let mut claimed: HashMap<String, String> = HashMap::new();

    for (goal, result) in goals.iter().zip(results) {
        let synthesized = match result {
            Ok(synthesized) => synthesized,
            Err(e) => {
                report.record_failure(goal.id(), &e);
                continue;
            }
        };

        if let Some(error) = first_collision(&claimed, &synthesized) {
            report.record_failure(goal.id(), &GoalError::Structural(error));
            continue;
        }
        for name in synthesized.generated_names() {
            claimed.insert(name, goal.id().to_string());
        }

        for finding in report::goal_findings(goal) {
            report.record_finding(finding);
        }
        report.goals.push(synthesized);
    }

    tracing::info!(
        generated = report.goals.len(),
        failed = report.failures.len(),
        "batch complete"
    );
    report
}

fn first_collision(
    claimed: &HashMap<String, String>,
    goal: &SynthesizedGoal,
) -> Option<StructuralError> {
    let mut own = HashSet::new();
    goal.generated_names().into_iter().find_map(|name| {
        if let Some(first) = claimed.get(&name) {
            return Some(StructuralError::DuplicateGoalName {
                name,
                first: first.clone(),
            });
        }
        if !own.insert(name.clone()) {
            return Some(StructuralError::DuplicateGoalName {
                name,
                first: goal.id.clone(),
            });
        }
        None
    })
}
