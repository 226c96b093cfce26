//! BatchReport: aggregated outcome of generating a batch of goals.
//!
//! Successful goals carry their synthesized graph; failed goals carry the
//! error that stopped them. Findings are notes about goals that did
//! synthesize but whose description contains something worth a second
//! look.

use crate::error::{GoalError, StructuralError};
use crate::goal::GoalDescription;
use crate::parameter::{NullPolicy, ParameterRole};
use crate::pass3_synthesize::SynthesizedGoal;
use serde::Serialize;

/// Severity level for a finding.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum FindingSeverity {
    Info,
    Warning,
}

/// A notable finding about one goal.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub goal: String,
    pub severity: FindingSeverity,
    pub message: String,
    pub parameter: Option<String>,
}

/// A goal that produced no output.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GoalFailure {
    pub goal: String,
    /// `structural` or `generics`.
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub goals: Vec<SynthesizedGoal>,
    pub failures: Vec<GoalFailure>,
    pub findings: Vec<Finding>,
}

impl BatchReport {
    pub fn new() -> Self {
        BatchReport::default()
    }

    /// Record a goal the front-end could not turn into a description.
    pub fn record_rejected(&mut self, goal: &str, error: StructuralError) {
        self.record_failure(goal, &GoalError::Structural(error));
    }

    pub fn record_failure(&mut self, goal: &str, error: &GoalError) {
        tracing::warn!(goal, kind = error.kind(), "{}", error);
        self.failures.push(GoalFailure {
            goal: goal.to_string(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        });
    }

    pub fn record_finding(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn goal(&self, id: &str) -> Option<&SynthesizedGoal> {
        self.goals.iter().find(|g| g.id == id)
    }
}

/// Findings for a goal that synthesized.
pub fn goal_findings(goal: &GoalDescription) -> Vec<Finding> {
    let mut findings = Vec::new();
    let goal_policy = goal.details().null_policy;

    for p in goal.parameters() {
        if p.resolved_null_policy(goal_policy) != NullPolicy::Reject {
            continue;
        }
        let (checked, what) = match p.role() {
            ParameterRole::LoneGetter { element_type, .. } => {
                (element_type.clone(), "element type")
            }
            _ => (p.ty().clone(), "type"),
        };
        if checked.option_inner().is_none() {
            findings.push(Finding {
                goal: goal.id().to_string(),
                severity: FindingSeverity::Info,
                message: format!(
                    "parameter '{}' rejects absent values, but its {} '{}' is never absent; no check is emitted",
                    p.name(),
                    what,
                    checked
                ),
                parameter: Some(p.name().to_string()),
            });
        }
    }

    if goal.parameters().is_empty() && goal.variants().builder {
        findings.push(Finding {
            goal: goal.id().to_string(),
            severity: FindingSeverity::Info,
            message: "goal has no parameters; a single factory function replaces the builder chain"
                .to_string(),
            parameter: None,
        });
        if goal.requests_recycler() && !goal.variants().updater {
            findings.push(Finding {
                goal: goal.id().to_string(),
                severity: FindingSeverity::Warning,
                message: "recycling has no effect on a goal without parameters".to_string(),
                parameter: None,
            });
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::{GoalDetails, Lifecycle, VariantRequest};
    use crate::parameter::Parameter;
    use crate::types::TypeRef;

    #[test]
    fn test_reject_on_non_option_is_noted() {
        let goal = GoalDescription::new(
            "person",
            GoalDetails::constructor(TypeRef::simple("Person"))
                .with_null_policy(NullPolicy::Reject),
            vec![
                Parameter::regular("name", TypeRef::simple("String")),
                Parameter::regular("nick", TypeRef::parse("Option<String>", &[]).unwrap()),
            ],
            VariantRequest::default(),
        )
        .unwrap();
        let findings = goal_findings(&goal);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].parameter.as_deref(), Some("name"));
        assert_eq!(findings[0].severity, FindingSeverity::Info);
    }

    #[test]
    fn test_recycled_factory_warns() {
        let goal = GoalDescription::new(
            "clock",
            GoalDetails::constructor(TypeRef::simple("Clock"))
                .with_lifecycle(Lifecycle::ReusePerThread),
            vec![],
            VariantRequest::default(),
        )
        .unwrap();
        let findings = goal_findings(&goal);
        assert!(findings
            .iter()
            .any(|f| f.severity == FindingSeverity::Warning));
    }

    #[test]
    fn test_failures_make_report_unclean() {
        let mut report = BatchReport::new();
        assert!(report.is_clean());
        report.record_rejected(
            "broken",
            StructuralError::InvalidType {
                text: "Vec<".into(),
                reason: "unexpected end".into(),
            },
        );
        assert!(!report.is_clean());
        assert_eq!(report.failures[0].kind, "structural");
    }
}
