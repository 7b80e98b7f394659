//! Core types for conversational inference

use serde::{Deserialize, Serialize};

/// Known inference providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    HuggingFace,
}

impl Provider {
    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Google => "Google",
            Provider::HuggingFace => "Hugging Face",
        }
    }

    /// Get the environment variable name for this provider's API key
    pub fn api_key_env_var(&self) -> &'static str {
        match self {
            Provider::Google => "GOOGLE_API_KEY",
            Provider::HuggingFace => "HF_TOKEN",
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "google" | "gemini" => Ok(Provider::Google),
            "huggingface" | "hf" => Ok(Provider::HuggingFace),
            other => Err(crate::Error::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Speaker roles in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Get the role as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in a conversation, tagged with its speaker role.
///
/// Immutable once appended to a history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub timestamp: i64,
}

impl Turn {
    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Options forwarded to the backend with each request.
///
/// A `None` field means "defer to the backend default" and is omitted from
/// the wire entirely, never sent as zero.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Nucleus sampling cutoff
    pub top_p: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Request an incremental fragment stream instead of one complete string
    pub streaming: bool,
}

/// Construction-time backend selection and credentials.
///
/// Model identifier and API key are fixed here, not per call.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Which provider to talk to
    pub provider: Provider,
    /// Model identifier (e.g. "gemini-2.0-flash")
    pub model: String,
    /// API key; falls back to the provider's environment variable when absent
    pub api_key: Option<String>,
    /// Override the provider's default base URL
    pub base_url: Option<String>,
}

impl BackendConfig {
    /// Create a config for a provider and model, deferring the key to the environment
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            api_key: None,
            base_url: None,
        }
    }

    /// Set an explicit API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set a base URL override
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str() {
        assert_eq!("google".parse::<Provider>().unwrap(), Provider::Google);
        assert_eq!("Gemini".parse::<Provider>().unwrap(), Provider::Google);
        assert_eq!("hf".parse::<Provider>().unwrap(), Provider::HuggingFace);
        assert_eq!(
            "HuggingFace".parse::<Provider>().unwrap(),
            Provider::HuggingFace
        );
        assert!(matches!(
            "mystery".parse::<Provider>(),
            Err(crate::Error::UnsupportedProvider(_))
        ));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_turn_constructors() {
        let t = Turn::user("hello");
        assert_eq!(t.role, Role::User);
        assert_eq!(t.content, "hello");

        let t = Turn::assistant("hi there");
        assert_eq!(t.role, Role::Assistant);
        assert_eq!(t.content, "hi there");
    }

    #[test]
    fn test_turn_deserializes_without_timestamp() {
        let t: Turn = serde_json::from_str(r#"{"role":"user","content":"x"}"#).unwrap();
        assert_eq!(t.role, Role::User);
        assert_eq!(t.timestamp, 0);
    }
}
