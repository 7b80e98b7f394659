//! Error types for confab-chat

use thiserror::Error;

/// Result type alias using confab-chat Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during a conversation
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the inference backend layer
    #[error(transparent)]
    Backend(#[from] confab_ai::Error),
}

impl Error {
    /// Check if this error is a credentials problem
    pub fn is_auth(&self) -> bool {
        match self {
            Error::Backend(e) => e.is_auth(),
        }
    }
}
