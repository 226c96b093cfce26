//! Raw goal-file structures, exactly as they appear in JSON.
//!
//! Types are kept as text here; [`crate::deserialize`] parses them against
//! each goal's declared type parameters when building descriptions.

use serde::{Deserialize, Serialize};
use stagecraft_core::{Access, Lifecycle, NullPolicy, Projection, TargetKind};

/// A goal description file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoalFile {
    pub id: String,
    #[serde(default)]
    pub goals: Vec<RawGoal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawGoal {
    pub id: String,
    pub kind: TargetKind,
    pub declaring_type: String,
    /// Defaults to the declaring type for constructor and bean goals and
    /// to `()` for method goals.
    #[serde(default)]
    pub result_type: Option<String>,
    /// Required for method goals; constructors default to `new`.
    #[serde(default)]
    pub invocation: Option<String>,
    #[serde(default)]
    pub access: Option<Access>,
    #[serde(default)]
    pub type_parameters: Vec<String>,
    #[serde(default)]
    pub instance_type_parameters: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub lifecycle: Option<Lifecycle>,
    #[serde(default)]
    pub goal_name: Option<String>,
    #[serde(default)]
    pub null_policy: Option<NullPolicy>,
    #[serde(default)]
    pub variants: RawVariants,
    #[serde(default)]
    pub parameters: Vec<RawParameter>,
}

/// Unset fields are filled from configuration defaults, then from the
/// built-in default (builder only).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawVariants {
    #[serde(default)]
    pub builder: Option<bool>,
    #[serde(default)]
    pub updater: Option<bool>,
    #[serde(default)]
    pub builder_access: Option<Access>,
    #[serde(default)]
    pub updater_access: Option<Access>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub null_policy: Option<NullPolicy>,
    #[serde(default)]
    pub float_left: Option<FloatLeft>,
    #[serde(default)]
    pub position: Option<usize>,
    #[serde(default)]
    pub projection: Option<Projection>,
    #[serde(default)]
    pub accessor: Option<RawAccessor>,
    #[serde(default)]
    pub lone_getter: Option<RawLoneGetter>,
}

/// `"float_left": true` or `"float_left": { "group": 2 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FloatLeft {
    Flag(bool),
    Group { group: i32 },
}

impl FloatLeft {
    /// `None` when floating is switched off, else the group key.
    pub fn group(self) -> Option<Option<i32>> {
        match self {
            FloatLeft::Flag(false) => None,
            FloatLeft::Flag(true) => Some(None),
            FloatLeft::Group { group } => Some(Some(group)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawAccessor {
    pub getter: String,
    #[serde(default)]
    pub setter: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawLoneGetter {
    pub getter: String,
    pub element_type: String,
    #[serde(default)]
    pub errors: Vec<String>,
}
