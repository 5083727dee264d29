//! Error types for color parsing and stylesheet splitting.

/// Error type for pigment operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PigmentError {
    /// A color literal could not be parsed.
    #[error("Invalid color literal: {0}")]
    InvalidColor(String),

    /// A `{` without its matching `}`.
    #[error("Unbalanced block starting at offset {offset}")]
    UnbalancedBlock { offset: usize },

    /// A `}` without an opening `{`.
    #[error("Unexpected `}}` at offset {offset}")]
    UnexpectedClose { offset: usize },
}

/// Result type for pigment operations.
pub type PigmentResult<T> = Result<T, PigmentError>;
