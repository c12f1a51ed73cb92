// Model errors surfaced to the command layer
//
// Every variant's Display string is the message shown to the end user.

/// Recoverable failures of the model layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Undo requested with nothing to undo. Covers both an empty history and a
    /// history holding only the current state.
    #[error("Undo cannot be done as there was no previous action")]
    NoPriorHistory,

    /// Redo requested with an empty redo stack.
    #[error("Redo cannot be done as there was no previous action")]
    NoRedoAvailable,

    /// A value object rejected its input.
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ModelError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ModelError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
