//! Generator configuration (`stagecraft.toml`).
//!
//! ```toml
//! [defaults]
//! null_policy = "reject"
//! updater = true
//!
//! [goals.person]
//! goal_name = "Human"
//! recycle = true
//!
//! [goals.person.parameters.name]
//! float_left = true
//! ```
//!
//! `[goals.<id>]` values override the goal file; `[defaults]` only fills
//! fields the goal file leaves unset.

use crate::deserialize::InterchangeError;
use crate::types::{FloatLeft, RawGoal};
use serde::Deserialize;
use stagecraft_core::{Access, Lifecycle, NullPolicy, StructuralError};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub goals: BTreeMap<String, GoalOverride>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    pub null_policy: Option<NullPolicy>,
    pub access: Option<Access>,
    pub builder: Option<bool>,
    pub updater: Option<bool>,
    pub recycle: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoalOverride {
    pub goal_name: Option<String>,
    pub access: Option<Access>,
    pub builder_access: Option<Access>,
    pub updater_access: Option<Access>,
    pub builder: Option<bool>,
    pub updater: Option<bool>,
    pub recycle: Option<bool>,
    pub null_policy: Option<NullPolicy>,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterOverride>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterOverride {
    pub null_policy: Option<NullPolicy>,
    pub float_left: Option<FloatLeft>,
    pub position: Option<usize>,
}

fn lifecycle(recycle: bool) -> Lifecycle {
    if recycle {
        Lifecycle::ReusePerThread
    } else {
        Lifecycle::NewInstancePerCall
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Config, InterchangeError> {
        toml::from_str(text).map_err(|e| InterchangeError::Config {
            message: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Config, InterchangeError> {
        let text = std::fs::read_to_string(path).map_err(|e| InterchangeError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Config::from_toml_str(&text)
    }

    /// Apply the goal's override table, then fill what is still unset from
    /// `[defaults]`. Fails only when the override names a parameter the
    /// goal does not have.
    pub fn apply(&self, goal: &mut RawGoal) -> Result<(), StructuralError> {
        if let Some(over) = self.goals.get(&goal.id) {
            for name in over.parameters.keys() {
                if !goal.parameters.iter().any(|p| &p.name == name) {
                    return Err(StructuralError::UnknownParameter { name: name.clone() });
                }
            }

            if over.goal_name.is_some() {
                goal.goal_name.clone_from(&over.goal_name);
            }
            goal.access = over.access.or(goal.access);
            goal.null_policy = over.null_policy.or(goal.null_policy);
            goal.lifecycle = over.recycle.map(lifecycle).or(goal.lifecycle);
            let variants = &mut goal.variants;
            variants.builder = over.builder.or(variants.builder);
            variants.updater = over.updater.or(variants.updater);
            variants.builder_access = over.builder_access.or(variants.builder_access);
            variants.updater_access = over.updater_access.or(variants.updater_access);

            for p in &mut goal.parameters {
                if let Some(po) = over.parameters.get(&p.name) {
                    p.null_policy = po.null_policy.or(p.null_policy);
                    p.float_left = po.float_left.or(p.float_left);
                    p.position = po.position.or(p.position);
                }
            }
        }

        let defaults = &self.defaults;
        goal.access = goal.access.or(defaults.access);
        goal.null_policy = goal.null_policy.or(defaults.null_policy);
        goal.lifecycle = goal.lifecycle.or(defaults.recycle.map(lifecycle));
        goal.variants.builder = goal.variants.builder.or(defaults.builder);
        goal.variants.updater = goal.variants.updater.or(defaults.updater);
        Ok(())
    }

    /// Override tables naming goals that no loaded file defines.
    pub fn unmatched_goals<'a>(&'a self, ids: &[&str]) -> Vec<&'a str> {
        self.goals
            .keys()
            .map(String::as_str)
            .filter(|id| !ids.contains(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RawParameter, RawVariants};
    use stagecraft_core::TargetKind;

    fn raw_goal() -> RawGoal {
        RawGoal {
            id: "person".into(),
            kind: TargetKind::Constructor,
            declaring_type: "Person".into(),
            result_type: None,
            invocation: None,
            access: None,
            type_parameters: vec![],
            instance_type_parameters: vec![],
            errors: vec![],
            lifecycle: None,
            goal_name: None,
            null_policy: Some(NullPolicy::Allow),
            variants: RawVariants::default(),
            parameters: vec![RawParameter {
                name: "name".into(),
                ty: "String".into(),
                null_policy: None,
                float_left: None,
                position: None,
                projection: None,
                accessor: None,
                lone_getter: None,
            }],
        }
    }

    #[test]
    fn test_defaults_fill_only_unset_fields() {
        let config = Config::from_toml_str(
            r#"
            [defaults]
            null_policy = "reject"
            access = "package_private"
            updater = true
            "#,
        )
        .unwrap();
        let mut goal = raw_goal();
        config.apply(&mut goal).unwrap();
        assert_eq!(goal.null_policy, Some(NullPolicy::Allow));
        assert_eq!(goal.access, Some(Access::PackagePrivate));
        assert_eq!(goal.variants.updater, Some(true));
        assert_eq!(goal.variants.builder, None);
    }

    #[test]
    fn test_goal_table_overrides_file() {
        let config = Config::from_toml_str(
            r#"
            [goals.person]
            goal_name = "Human"
            null_policy = "reject"
            recycle = true

            [goals.person.parameters.name]
            float_left = { group = 1 }
            position = 0
            "#,
        )
        .unwrap();
        let mut goal = raw_goal();
        config.apply(&mut goal).unwrap();
        assert_eq!(goal.goal_name.as_deref(), Some("Human"));
        assert_eq!(goal.null_policy, Some(NullPolicy::Reject));
        assert_eq!(goal.lifecycle, Some(Lifecycle::ReusePerThread));
        assert_eq!(goal.parameters[0].float_left, Some(FloatLeft::Group { group: 1 }));
        assert_eq!(goal.parameters[0].position, Some(0));
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let config = Config::from_toml_str(
            r#"
            [goals.person.parameters.nickname]
            null_policy = "reject"
            "#,
        )
        .unwrap();
        let err = config.apply(&mut raw_goal()).unwrap_err();
        assert_eq!(
            err,
            StructuralError::UnknownParameter {
                name: "nickname".into()
            }
        );
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let err = Config::from_toml_str("[defaults]\nnull_policy = \"sometimes\"\n").unwrap_err();
        assert!(matches!(err, InterchangeError::Config { .. }));
    }

    #[test]
    fn test_unmatched_goals() {
        let config = Config::from_toml_str("[goals.ghost]\nupdater = true\n").unwrap();
        assert_eq!(config.unmatched_goals(&["person"]), vec!["ghost"]);
    }
}
