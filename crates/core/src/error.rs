use thiserror::Error;

/// Errors reported by a [`CommentGenerator`](crate::CommentGenerator) backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// The backend failed (process exited, transport error, bad status)
    #[error("Generator backend error: {0}")]
    Backend(String),

    /// The backend did not answer in time
    #[error("Generator timed out")]
    Timeout,
}

impl GenerateError {
    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}
