/// Error type for code generation operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodegenError {
    /// A synthesized goal has a shape the Rust rendering cannot express.
    #[error("cannot emit goal '{goal}': {message}")]
    Emit { goal: String, message: String },

    /// An I/O error occurred while writing the generated module.
    #[error("I/O error: {0}")]
    Io(String),

    /// The generator configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CodegenError {
    pub(crate) fn emit(goal: &str, message: impl Into<String>) -> Self {
        CodegenError::Emit {
            goal: goal.to_string(),
            message: message.into(),
        }
    }
}
