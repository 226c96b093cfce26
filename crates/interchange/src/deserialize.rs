//! Goal files into validated [`GoalDescription`]s.
//!
//! A malformed file (bad JSON, wrong shape, duplicate goal ids) is an
//! [`InterchangeError`] and nothing is loaded. A single goal that cannot be
//! converted is rejected alone and reported with its [`StructuralError`].

use crate::config::Config;
use crate::types::*;
use stagecraft_core::{
    generate_batch, BatchReport, Finding, FindingSeverity, GoalDescription, GoalDetails, Lifecycle,
    NullPolicy, Parameter, PositionHint, StructuralError, TargetKind, TypeRef, TypeVar,
    VariantRequest,
};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterchangeError {
    #[error("failed to read '{path}': {message}")]
    Io { path: String, message: String },

    #[error("invalid goal file: {message}")]
    Parse { message: String },

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("goal id '{id}' is defined more than once")]
    DuplicateGoalId { id: String },
}

/// Goals loaded from one file, plus what could not be loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadedGoals {
    pub file_id: String,
    pub goals: Vec<GoalDescription>,
    pub rejected: Vec<(String, StructuralError)>,
    pub findings: Vec<Finding>,
}

impl LoadedGoals {
    /// Run the pipeline over the loaded goals and fold the load-time
    /// rejections and findings into the batch report.
    pub fn generate(&self) -> BatchReport {
        let mut report = generate_batch(&self.goals);
        for (goal, error) in &self.rejected {
            report.record_rejected(goal, error.clone());
        }
        report.findings.extend(self.findings.iter().cloned());
        report
    }
}

/// Deserialize the raw file structure.
pub fn from_interchange(value: &serde_json::Value) -> Result<GoalFile, InterchangeError> {
    let file: GoalFile =
        serde_json::from_value(value.clone()).map_err(|e| InterchangeError::Parse {
            message: e.to_string(),
        })?;

    let mut seen = HashSet::new();
    for goal in &file.goals {
        if !seen.insert(goal.id.as_str()) {
            return Err(InterchangeError::DuplicateGoalId {
                id: goal.id.clone(),
            });
        }
    }
    Ok(file)
}

/// Deserialize a goal file and convert every goal, applying `config`.
pub fn load_goals(
    value: &serde_json::Value,
    config: Option<&Config>,
) -> Result<LoadedGoals, InterchangeError> {
    let file = from_interchange(value)?;
    let mut loaded = LoadedGoals {
        file_id: file.id,
        ..LoadedGoals::default()
    };

    if let Some(config) = config {
        let ids: Vec<&str> = file.goals.iter().map(|g| g.id.as_str()).collect();
        for id in config.unmatched_goals(&ids) {
            loaded.findings.push(Finding {
                goal: id.to_string(),
                severity: FindingSeverity::Warning,
                message: format!("configuration names goal '{}', which the goal file does not define", id),
                parameter: None,
            });
        }
    }

    for mut raw in file.goals {
        if let Some(config) = config {
            if let Err(e) = config.apply(&mut raw) {
                tracing::warn!(goal = %raw.id, "configuration rejected: {}", e);
                loaded.rejected.push((raw.id, e));
                continue;
            }
        }
        match convert_goal(&raw, &mut loaded.findings) {
            Ok(goal) => loaded.goals.push(goal),
            Err(e) => {
                tracing::warn!(goal = %raw.id, "goal rejected: {}", e);
                loaded.rejected.push((raw.id, e));
            }
        }
    }

    tracing::debug!(
        file = %loaded.file_id,
        loaded = loaded.goals.len(),
        rejected = loaded.rejected.len(),
        "goal file loaded"
    );
    Ok(loaded)
}

/// Read, deserialize and convert a goal file.
pub fn load_goal_file(path: &Path, config: Option<&Config>) -> Result<LoadedGoals, InterchangeError> {
    let value = read_json(path)?;
    load_goals(&value, config)
}

pub fn read_json(path: &Path) -> Result<serde_json::Value, InterchangeError> {
    let text = std::fs::read_to_string(path).map_err(|e| InterchangeError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| InterchangeError::Parse {
        message: format!("{}: {}", path.display(), e),
    })
}

fn parse_types(texts: &[String], declared: &[TypeVar]) -> Result<Vec<TypeRef>, StructuralError> {
    texts.iter().map(|t| TypeRef::parse(t, declared)).collect()
}

fn convert_goal(raw: &RawGoal, findings: &mut Vec<Finding>) -> Result<GoalDescription, StructuralError> {
    let declared: Vec<TypeVar> = raw.type_parameters.iter().map(TypeVar::new).collect();
    let declaring_type = TypeRef::parse(&raw.declaring_type, &declared)?;
    let result_type = raw
        .result_type
        .as_deref()
        .map(|t| TypeRef::parse(t, &declared))
        .transpose()?;

    let mut details = match raw.kind {
        TargetKind::Constructor => GoalDetails::constructor(declaring_type),
        TargetKind::Bean => GoalDetails::bean(declaring_type),
        TargetKind::StaticMethod | TargetKind::InstanceMethod => {
            let name = raw.invocation.as_deref().ok_or_else(|| StructuralError::MissingField {
                kind: raw.kind.label().to_string(),
                field: "invocation".to_string(),
            })?;
            let result = result_type.clone().unwrap_or_else(TypeRef::unit);
            if raw.kind == TargetKind::StaticMethod {
                GoalDetails::static_method(declaring_type, name, result)
            } else {
                GoalDetails::instance_method(declaring_type, name, result)
            }
        }
    };
    if matches!(raw.kind, TargetKind::Constructor | TargetKind::Bean) {
        if let Some(result) = result_type {
            details.result_type = result;
        }
        if let (TargetKind::Constructor, Some(name)) = (raw.kind, &raw.invocation) {
            details.invocation_name = name.clone();
        }
    }

    details = details
        .with_type_parameters(declared.clone())
        .with_instance_type_parameters(raw.instance_type_parameters.iter().map(TypeVar::new).collect())
        .with_exceptions(parse_types(&raw.errors, &declared)?)
        .with_access(raw.access.unwrap_or_default())
        .with_lifecycle(raw.lifecycle.unwrap_or(Lifecycle::NewInstancePerCall))
        .with_null_policy(raw.null_policy.unwrap_or(NullPolicy::Inherit));
    if let Some(name) = &raw.goal_name {
        details = details.with_goal_name(name.clone());
    }

    let parameters = raw
        .parameters
        .iter()
        .map(|p| convert_parameter(raw, p, &declared, findings))
        .collect::<Result<Vec<_>, _>>()?;

    let defaults = VariantRequest::default();
    let variants = VariantRequest {
        builder: raw.variants.builder.unwrap_or(defaults.builder),
        updater: raw.variants.updater.unwrap_or(defaults.updater),
        builder_access: raw.variants.builder_access,
        updater_access: raw.variants.updater_access,
    };

    GoalDescription::new(raw.id.clone(), details, parameters, variants)
}

fn convert_parameter(
    goal: &RawGoal,
    raw: &RawParameter,
    declared: &[TypeVar],
    findings: &mut Vec<Finding>,
) -> Result<Parameter, StructuralError> {
    let ty = TypeRef::parse(&raw.ty, declared)?;

    let mut parameter = match (&raw.accessor, &raw.lone_getter) {
        (Some(_), Some(_)) => {
            return Err(StructuralError::RoleMismatch {
                name: raw.name.clone(),
                role: "both an accessor pair and a lone getter".to_string(),
                kind: goal.kind.label().to_string(),
            })
        }
        (Some(accessor), None) => Parameter::accessor(
            raw.name.clone(),
            ty,
            accessor.getter.clone(),
            accessor.setter.as_deref(),
        )
        .with_accessor_errors(parse_types(&accessor.errors, declared)?),
        (None, Some(lone)) => Parameter::lone_getter(
            raw.name.clone(),
            ty,
            lone.getter.clone(),
            TypeRef::parse(&lone.element_type, declared)?,
        )
        .with_accessor_errors(parse_types(&lone.errors, declared)?),
        (None, None) => Parameter::regular(raw.name.clone(), ty),
    };

    if let Some(projection) = &raw.projection {
        parameter = parameter.with_projection(projection.clone());
    }
    if let Some(policy) = raw.null_policy {
        parameter = parameter.with_null_policy(policy);
    }

    let float = raw.float_left.and_then(FloatLeft::group);
    let hint = match (raw.position, float) {
        (Some(position), float) => {
            if float.is_some() {
                findings.push(Finding {
                    goal: goal.id.clone(),
                    severity: FindingSeverity::Info,
                    message: format!(
                        "parameter '{}' floats left but also claims position {}; the position wins",
                        raw.name, position
                    ),
                    parameter: Some(raw.name.clone()),
                });
            }
            PositionHint::Absolute { position }
        }
        (None, Some(group)) => PositionHint::FloatLeft { group },
        (None, None) => PositionHint::Declared,
    };
    Ok(parameter.with_position(hint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn file(goals: serde_json::Value) -> serde_json::Value {
        json!({ "id": "test", "goals": goals })
    }

    #[test]
    fn test_constructor_goal_round_trips_into_description() {
        let loaded = load_goals(
            &file(json!([{
                "id": "person",
                "kind": "constructor",
                "declaring_type": "Person",
                "parameters": [
                    { "name": "name", "type": "String" },
                    { "name": "age", "type": "u32", "float_left": true }
                ]
            }])),
            None,
        )
        .unwrap();
        assert!(loaded.rejected.is_empty());
        let goal = &loaded.goals[0];
        assert_eq!(goal.goal_name(), "Person");
        assert_eq!(
            goal.position_hints(),
            vec![PositionHint::Declared, PositionHint::FloatLeft { group: None }]
        );
    }

    #[test]
    fn test_missing_goals_field_is_empty_file() {
        let loaded = load_goals(&json!({ "id": "empty" }), None).unwrap();
        assert!(loaded.goals.is_empty());
    }

    #[test]
    fn test_missing_id_is_file_error() {
        let err = from_interchange(&json!({ "goals": [] })).unwrap_err();
        assert!(matches!(err, InterchangeError::Parse { .. }));
    }

    #[test]
    fn test_duplicate_goal_id_is_file_error() {
        let goal = json!({ "id": "a", "kind": "constructor", "declaring_type": "A" });
        let err = from_interchange(&file(json!([goal.clone(), goal]))).unwrap_err();
        assert_eq!(err, InterchangeError::DuplicateGoalId { id: "a".into() });
    }

    #[test]
    fn test_bad_type_rejects_only_that_goal() {
        let loaded = load_goals(
            &file(json!([
                {
                    "id": "broken",
                    "kind": "constructor",
                    "declaring_type": "Broken",
                    "parameters": [{ "name": "x", "type": "Vec<" }]
                },
                { "id": "fine", "kind": "constructor", "declaring_type": "Fine" }
            ])),
            None,
        )
        .unwrap();
        assert_eq!(loaded.goals.len(), 1);
        assert_eq!(loaded.rejected.len(), 1);
        assert_eq!(loaded.rejected[0].0, "broken");
        assert!(matches!(loaded.rejected[0].1, StructuralError::InvalidType { .. }));
    }

    #[test]
    fn test_method_goal_without_invocation_rejected() {
        let loaded = load_goals(
            &file(json!([{ "id": "m", "kind": "static_method", "declaring_type": "Maps" }])),
            None,
        )
        .unwrap();
        assert!(matches!(
            loaded.rejected[0].1,
            StructuralError::MissingField { .. }
        ));
    }

    #[test]
    fn test_position_overrides_float_with_finding() {
        let loaded = load_goals(
            &file(json!([{
                "id": "pair",
                "kind": "constructor",
                "declaring_type": "Pair",
                "parameters": [
                    { "name": "a", "type": "u8" },
                    { "name": "b", "type": "u8", "float_left": { "group": 1 }, "position": 0 }
                ]
            }])),
            None,
        )
        .unwrap();
        assert_eq!(
            loaded.goals[0].position_hints()[1],
            PositionHint::Absolute { position: 0 }
        );
        assert_eq!(loaded.findings.len(), 1);
        assert_eq!(loaded.findings[0].parameter.as_deref(), Some("b"));
    }

    #[test]
    fn test_generic_static_method_types_resolve_vars() {
        let loaded = load_goals(
            &file(json!([{
                "id": "entry",
                "kind": "static_method",
                "declaring_type": "Maps",
                "invocation": "entry",
                "result_type": "Entry<K, V>",
                "type_parameters": ["K", "V"],
                "parameters": [
                    { "name": "key", "type": "K" },
                    { "name": "value", "type": "V" }
                ]
            }])),
            None,
        )
        .unwrap();
        let goal = &loaded.goals[0];
        assert_eq!(goal.parameters()[0].ty(), &TypeRef::var("K"));
        assert_eq!(goal.goal_name(), "Entry");
    }

    #[test]
    fn test_generate_folds_rejections_into_report() {
        let config = Config::from_toml_str("[goals.fine.parameters.nope]\nposition = 0\n").unwrap();
        let loaded = load_goals(
            &file(json!([{ "id": "fine", "kind": "constructor", "declaring_type": "Fine" }])),
            Some(&config),
        )
        .unwrap();
        let report = loaded.generate();
        assert!(report.goals.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, "structural");
    }
}
