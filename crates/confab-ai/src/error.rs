//! Error types for confab-ai

use thiserror::Error;

/// Result type alias using confab-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to an inference backend
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response
    #[error("API error: {message} (type: {error_type})")]
    Api { error_type: String, message: String },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Provider not supported
    #[error("Provider not supported: {0}")]
    UnsupportedProvider(String),
}

impl Error {
    /// Create an API error from type and message
    pub fn api(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// Check if this error is a credentials problem
    pub fn is_auth(&self) -> bool {
        match self {
            Error::Auth(_) | Error::InvalidApiKey => true,
            Error::Api { error_type, .. } => {
                let et = error_type.to_lowercase();
                et.contains("auth") || et.contains("permission") || et.contains("unauthenticated")
            }
            _ => false,
        }
    }

    /// Check if this error came from the transport rather than the service
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Sse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_typed_variants() {
        assert!(Error::InvalidApiKey.is_auth());
        assert!(Error::Auth("key rejected".into()).is_auth());
    }

    #[test]
    fn test_auth_api_error_type() {
        let e = Error::api("authentication_error", "Invalid API key");
        assert!(e.is_auth());
    }

    #[test]
    fn test_auth_api_unauthenticated() {
        let e = Error::api("UNAUTHENTICATED", "API key not valid");
        assert!(e.is_auth());
    }

    #[test]
    fn test_auth_api_permission_denied() {
        let e = Error::api("PERMISSION_DENIED", "Caller does not have permission");
        assert!(e.is_auth());
    }

    #[test]
    fn test_not_auth_other_api_errors() {
        let e = Error::api("invalid_request_error", "Bad field");
        assert!(!e.is_auth());
        assert!(!Error::Sse("connection reset".into()).is_auth());
    }

    #[test]
    fn test_transport_variants() {
        assert!(Error::Sse("stream cut".into()).is_transport());
        assert!(!Error::InvalidApiKey.is_transport());
        assert!(!Error::api("server_error", "oops").is_transport());
    }
}
