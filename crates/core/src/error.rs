use serde::{Deserialize, Serialize};

/// A malformed goal description. Aborts synthesis for the offending goal
/// only; sibling goals in the same batch are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum StructuralError {
    #[error("duplicate parameter name '{name}'")]
    DuplicateParameter { name: String },

    #[error("'{name}' is not a valid identifier")]
    InvalidIdentifier { name: String },

    #[error("parameters '{first}' and '{second}' both name the step type suffix '{suffix}'")]
    StepNameCollision {
        first: String,
        second: String,
        suffix: String,
    },

    #[error("parameter name '{name}' is reserved by the generated {context}")]
    ReservedName { name: String, context: String },

    #[error("parameters '{first}' and '{second}' both claim step position {position}")]
    ConflictingPosition {
        position: usize,
        first: String,
        second: String,
    },

    #[error(
        "parameter '{name}' claims step position {position}, but the goal has {count} parameter(s)"
    )]
    PositionOutOfRange {
        name: String,
        position: usize,
        count: usize,
    },

    #[error("{hints} position hint(s) supplied for {parameters} parameter(s)")]
    HintCountMismatch { parameters: usize, hints: usize },

    #[error("instance type parameter '{var}' is not among the declared type parameters")]
    UndeclaredInstanceParameter { var: String },

    #[error("instance type parameters are only meaningful for instance-method goals, not {kind} goals")]
    UnexpectedInstanceParameters { kind: String },

    #[error("parameter '{name}' is {role}, which a {kind} goal cannot carry")]
    RoleMismatch {
        name: String,
        role: String,
        kind: String,
    },

    #[error("an updater was requested but parameter '{name}' has no projection")]
    MissingProjection { name: String },

    #[error("recycling was requested for a generic goal (type parameters: {vars})")]
    RecyclingGenericGoal { vars: String },

    #[error("neither a builder nor an updater was requested")]
    NoVariantRequested,

    #[error("invalid type '{text}': {reason}")]
    InvalidType { text: String, reason: String },

    #[error("generated name '{name}' is already claimed by goal '{first}'")]
    DuplicateGoalName { name: String, first: String },

    #[error("configuration names unknown parameter '{name}'")]
    UnknownParameter { name: String },

    #[error("{kind} goal is missing required field '{field}'")]
    MissingField { kind: String, field: String },
}

/// Per-goal generation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GoalError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("type variable '{var}' cannot be bound: {reason}")]
    GenericsUnsatisfiable { var: String, reason: String },
}

impl GoalError {
    /// Short machine-readable classification used in batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            GoalError::Structural(_) => "structural",
            GoalError::GenericsUnsatisfiable { .. } => "generics",
        }
    }

    pub fn generics(var: &crate::types::TypeVar, reason: impl Into<String>) -> Self {
        GoalError::GenericsUnsatisfiable {
            var: var.to_string(),
            reason: reason.into(),
        }
    }
}
