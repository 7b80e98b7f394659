//! Hugging Face inference router backend
//!
//! The router exposes hosted models behind the OpenAI chat completions wire
//! format, including its SSE streaming variant.

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

use crate::{
    backends::InferenceBackend,
    error::{Error, Result},
    stream::BackendReply,
    types::{CallOptions, Turn},
};

const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/v1";

/// Hugging Face router client
pub struct HuggingFaceBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl HuggingFaceBackend {
    /// Create a new Hugging Face backend for a model with an API key
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
        let api_key = std::env::var("HF_TOKEN")
            .or_else(|_| std::env::var("HUGGING_FACE_HUB_TOKEN"))
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
impl InferenceBackend for HuggingFaceBackend {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn send(&self, turns: &[Turn], options: &CallOptions) -> Result<BackendReply> {
        let request = build_request(&self.model, turns, options);
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!("Hugging Face request for model {}", self.model);

        let request_builder = self
            .client
            .post(&url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&request);

        if options.streaming {
            let event_source = EventSource::new(request_builder)
                .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

            Ok(BackendReply::Fragments(Box::pin(fragment_stream(
                event_source,
            ))))
        } else {
            let response = request_builder.send().await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(error_from_body(status, &body));
            }

            let body: ChatCompletionResponse = response.json().await?;
            Ok(BackendReply::Complete(response_text(body)?))
        }
    }
}

fn build_request(model: &str, turns: &[Turn], options: &CallOptions) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model.to_string(),
        messages: turns
            .iter()
            .map(|turn| ChatMessage {
                role: turn.role.as_str().to_string(),
                content: turn.content.clone(),
            })
            .collect(),
        stream: options.streaming,
        temperature: options.temperature,
        top_p: options.top_p,
        max_tokens: options.max_tokens,
    }
}

fn response_text(response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| Error::UnexpectedResponse("no choices in response".into()))
}

fn error_from_body(status: reqwest::StatusCode, body: &str) -> Error {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Error::Auth(body.to_string());
    }
    if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) {
        return Error::api("api_error", parsed.error.message());
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
                    if msg.data == "[DONE]" {
                        break;
                    }

                    match serde_json::from_str::<ChatCompletionChunk>(&msg.data) {
                        Ok(chunk) => {
                            let delta = chunk
                                .choices
                                .into_iter()
                                .next()
                                .and_then(|choice| choice.delta.content);
                            if let Some(text) = delta {
                                yield Ok(text);
                            }
                        }
                        Err(e) => {
                            yield Err(Error::Sse(format!("Failed to parse chunk: {}", e)));
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
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

// Response types

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Structured { message: String },
    Plain(String),
}

impl ErrorBody {
    fn message(self) -> String {
        match self {
            ErrorBody::Structured { message } => message,
            ErrorBody::Plain(message) => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turns() -> Vec<Turn> {
        vec![Turn::user("Hi"), Turn::assistant("Hello!"), Turn::user("X")]
    }

    #[test]
    fn test_request_carries_roles_verbatim() {
        let request = build_request("test-model", &turns(), &CallOptions::default());
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "test-model");
        assert_eq!(value["stream"], false);
        let messages = value["messages"].as_array().unwrap();
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["content"], "Hello!");
    }

    #[test]
    fn test_request_omits_unset_options() {
        let request = build_request("m", &turns(), &CallOptions::default());
        let value = serde_json::to_value(&request).unwrap();

        assert!(value.get("temperature").is_none());
        assert!(value.get("top_p").is_none());
        assert!(value.get("max_tokens").is_none());
    }

    #[test]
    fn test_request_streaming_flag() {
        let options = CallOptions {
            streaming: true,
            max_tokens: Some(1000),
            ..Default::default()
        };
        let request = build_request("m", &turns(), &options);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["stream"], true);
        assert_eq!(value["max_tokens"], 1000);
    }

    #[test]
    fn test_response_text_reads_first_choice() {
        let body = r#"{
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Good."}, "finish_reason": "stop"}]
        }"#;
        let response: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response_text(response).unwrap(), "Good.");
    }

    #[test]
    fn test_response_without_choices_is_unexpected() {
        let response: ChatCompletionResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            response_text(response),
            Err(Error::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_chunk_delta_content() {
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"choices": [{"index": 0, "delta": {"content": "Hel"}}]}"#,
        )
        .unwrap();
        let delta = chunk.choices.into_iter().next().unwrap().delta.content;
        assert_eq!(delta.as_deref(), Some("Hel"));
    }

    #[test]
    fn test_chunk_role_preamble_has_no_content() {
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"choices": [{"index": 0, "delta": {"role": "assistant"}}]}"#,
        )
        .unwrap();
        let delta = chunk.choices.into_iter().next().unwrap().delta.content;
        assert!(delta.is_none());
    }

    #[test]
    fn test_error_body_structured_and_plain() {
        let err = error_from_body(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error": {"message": "model is overloaded"}}"#,
        );
        assert!(matches!(err, Error::Api { message, .. } if message == "model is overloaded"));

        let err = error_from_body(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error": "Model requires a Pro subscription"}"#,
        );
        assert!(matches!(err, Error::Api { message, .. } if message.contains("Pro subscription")));
    }

    #[test]
    fn test_unauthorized_is_auth_error() {
        let err = error_from_body(reqwest::StatusCode::UNAUTHORIZED, "Invalid credentials");
        assert!(matches!(err, Error::Auth(_)));
    }
}
