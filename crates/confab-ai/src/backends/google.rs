//! Google Generative AI (Gemini) backend

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

use crate::{
    backends::InferenceBackend,
    error::{Error, Result},
    stream::BackendReply,
    types::{CallOptions, Role, Turn},
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Generative AI client
pub struct GoogleBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GoogleBackend {
    /// Create a new Google backend for a model with an API key
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from environment variable
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .map_err(|_| Error::InvalidApiKey)?;
        Ok(Self::new(model, api_key))
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl InferenceBackend for GoogleBackend {
    fn name(&self) -> &str {
        "google"
    }

    async fn send(&self, turns: &[Turn], options: &CallOptions) -> Result<BackendReply> {
        let request = build_request(turns, options);

        if options.streaming {
            let url = format!(
                "{}/models/{}:streamGenerateContent?alt=sse&key={}",
                self.base_url, self.model, self.api_key
            );
            tracing::debug!("Gemini stream request for model {}", self.model);

            let request_builder = self
                .client
                .post(&url)
                .header("content-type", "application/json")
                .json(&request);

            let event_source = EventSource::new(request_builder)
                .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

            Ok(BackendReply::Fragments(Box::pin(fragment_stream(
                event_source,
            ))))
        } else {
            let url = format!(
                "{}/models/{}:generateContent?key={}",
                self.base_url, self.model, self.api_key
            );
            tracing::debug!("Gemini request for model {}", self.model);

            let response = self
                .client
                .post(&url)
                .header("content-type", "application/json")
                .json(&request)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(error_from_body(status, &body));
            }

            let body: GeminiResponse = response.json().await?;
            Ok(BackendReply::Complete(response_text(body)?))
        }
    }
}

fn build_request(turns: &[Turn], options: &CallOptions) -> GeminiRequest {
    let contents = turns
        .iter()
        .map(|turn| GeminiContent {
            // Gemini names the assistant role "model"
            role: match turn.role {
                Role::User => "user".to_string(),
                Role::Assistant => "model".to_string(),
            },
            parts: vec![GeminiPart {
                text: turn.content.clone(),
            }],
        })
        .collect();

    let generation_config = if options.temperature.is_none()
        && options.top_p.is_none()
        && options.max_tokens.is_none()
    {
        None
    } else {
        Some(GeminiGenerationConfig {
            temperature: options.temperature,
            top_p: options.top_p,
            max_output_tokens: options.max_tokens,
        })
    };

    GeminiRequest {
        contents,
        generation_config,
    }
}

fn response_text(response: GeminiResponse) -> Result<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::UnexpectedResponse("no candidates in response".into()))?;

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    Ok(parts.into_iter().filter_map(|p| p.text).collect())
}

fn error_from_body(status: reqwest::StatusCode, body: &str) -> Error {
    if let Ok(parsed) = serde_json::from_str::<GeminiErrorResponse>(body) {
        return Error::api(
            parsed.error.status.unwrap_or_else(|| "api_error".to_string()),
            parsed.error.message,
        );
    }
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Error::Auth(body.to_string());
    }
    Error::api(status.as_str(), body)
}

fn fragment_stream(mut event_source: EventSource) -> impl futures::Stream<Item = Result<String>> {
    stream! {
        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    if msg.data.is_empty() {
                        continue;
                    }

                    match serde_json::from_str::<GeminiResponse>(&msg.data) {
                        Ok(chunk) => {
                            for candidate in chunk.candidates {
                                let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
                                for part in parts {
                                    if let Some(text) = part.text {
                                        yield Ok(text);
                                    }
                                }
                            }
                        }
                        Err(e) => {
                            if let Ok(err) = serde_json::from_str::<GeminiErrorResponse>(&msg.data) {
                                yield Err(Error::api(
                                    err.error.status.unwrap_or_else(|| "stream_error".to_string()),
                                    err.error.message,
                                ));
                            } else {
                                yield Err(Error::Sse(format!("Failed to parse chunk: {}", e)));
                            }
                            return;
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(e) => {
                    yield Err(Error::Sse(e.to_string()));
                    return;
                }
            }
        }
    }
}

// Request types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

// Response types

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turns() -> Vec<Turn> {
        vec![
            Turn::user("Hi"),
            Turn::assistant("Hello!"),
            Turn::user("How are you?"),
        ]
    }

    #[test]
    fn test_request_maps_assistant_role_to_model() {
        let request = build_request(&turns(), &CallOptions::default());
        let value = serde_json::to_value(&request).unwrap();

        let contents = value["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["text"], "How are you?");
    }

    #[test]
    fn test_request_omits_generation_config_when_unset() {
        let request = build_request(&turns(), &CallOptions::default());
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("generationConfig").is_none());
    }

    #[test]
    fn test_request_serializes_set_options_only() {
        let options = CallOptions {
            temperature: Some(0.7),
            max_tokens: Some(1000),
            ..Default::default()
        };
        let request = build_request(&turns(), &options);
        let value = serde_json::to_value(&request).unwrap();

        let config = &value["generationConfig"];
        assert_eq!(config["maxOutputTokens"], 1000);
        assert!(config.get("topP").is_none());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let body = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "Good"}, {"text": " day."}], "role": "model"},
                "finishReason": "STOP"
            }]
        }"#;
        let response: GeminiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response_text(response).unwrap(), "Good day.");
    }

    #[test]
    fn test_response_text_without_candidates_is_unexpected() {
        let response: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            response_text(response),
            Err(Error::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_error_body_parsed_into_api_error() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        let err = error_from_body(reqwest::StatusCode::BAD_REQUEST, body);
        match err {
            Error::Api {
                error_type,
                message,
            } => {
                assert_eq!(error_type, "INVALID_ARGUMENT");
                assert_eq!(message, "API key not valid");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_unparseable_unauthorized_body_is_auth_error() {
        let err = error_from_body(reqwest::StatusCode::UNAUTHORIZED, "nope");
        assert!(matches!(err, Error::Auth(_)));
    }
}
