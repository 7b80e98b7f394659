//! Inference backend implementations

pub mod google;
pub mod huggingface;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{BackendConfig, BackendReply, CallOptions, Error, Provider, Result, Turn};

/// Trait for inference backends.
///
/// A backend turns an ordered turn sequence into generated text, either as
/// one complete string or as an incremental fragment stream. Any session
/// state a provider keeps on its side is private to it; callers always
/// supply the full history explicitly.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Short provider name for diagnostics
    fn name(&self) -> &str;

    /// Send a turn sequence and return the reply
    async fn send(&self, turns: &[Turn], options: &CallOptions) -> Result<BackendReply>;
}

/// Get an API key from environment or provided value
pub fn get_api_key(provided: Option<&str>, env_var: &str) -> Result<String> {
    if let Some(key) = provided {
        return Ok(key.to_string());
    }

    std::env::var(env_var).map_err(|_| Error::InvalidApiKey)
}

/// Construct the backend selected by a config
pub fn backend_for(config: &BackendConfig) -> Result<Arc<dyn InferenceBackend>> {
    match config.provider {
        Provider::Google => {
            let mut backend = match &config.api_key {
                Some(key) => google::GoogleBackend::new(&config.model, key.clone()),
                None => google::GoogleBackend::from_env(&config.model)?,
            };
            if let Some(base_url) = &config.base_url {
                backend = backend.with_base_url(base_url);
            }
            Ok(Arc::new(backend))
        }
        Provider::HuggingFace => {
            let key = get_api_key(
                config.api_key.as_deref(),
                config.provider.api_key_env_var(),
            )?;
            let mut backend = huggingface::HuggingFaceBackend::new(&config.model, key);
            if let Some(base_url) = &config.base_url {
                backend = backend.with_base_url(base_url);
            }
            Ok(Arc::new(backend))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_api_key_prefers_provided() {
        let key = get_api_key(Some("sk-explicit"), "CONFAB_NO_SUCH_VAR").unwrap();
        assert_eq!(key, "sk-explicit");
    }

    #[test]
    fn test_get_api_key_missing_everywhere() {
        assert!(matches!(
            get_api_key(None, "CONFAB_NO_SUCH_VAR"),
            Err(Error::InvalidApiKey)
        ));
    }

    #[test]
    fn test_backend_for_dispatches_on_provider() {
        let google = backend_for(
            &BackendConfig::new(Provider::Google, "gemini-2.0-flash").with_api_key("k"),
        )
        .unwrap();
        assert_eq!(google.name(), "google");

        let hf = backend_for(
            &BackendConfig::new(Provider::HuggingFace, "meta-llama/Llama-3.1-8B-Instruct")
                .with_api_key("k"),
        )
        .unwrap();
        assert_eq!(hf.name(), "huggingface");
    }
}
