//! The conversational client: one call contract over any backend.

use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use confab_ai::{BackendConfig, BackendReply, CallOptions, InferenceBackend, Turn};
use futures::StreamExt;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_stream::Stream;

use crate::error::Result;
use crate::history::TurnStore;

/// A stream of reply fragments handed to the caller
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Per-call parameters
#[derive(Debug, Clone)]
pub struct CallSpec {
    /// Send the stored history ahead of the new prompt
    pub use_history: bool,
    /// Backend options for this call
    pub options: CallOptions,
}

impl Default for CallSpec {
    fn default() -> Self {
        Self {
            use_history: true,
            options: CallOptions::default(),
        }
    }
}

impl CallSpec {
    /// Create a spec with the defaults: history on, streaming off
    pub fn new() -> Self {
        Self::default()
    }

    /// Send only the new prompt, ignoring stored history
    pub fn without_history(mut self) -> Self {
        self.use_history = false;
        self
    }

    /// Ask for an incremental fragment stream
    pub fn streaming(mut self) -> Self {
        self.options.streaming = true;
        self
    }

    /// Set the backend options, keeping a streaming mode already requested
    pub fn with_options(mut self, options: CallOptions) -> Self {
        let streaming = self.options.streaming || options.streaming;
        self.options = options;
        self.options.streaming = streaming;
        self
    }
}

/// The reply handed back to the caller
pub enum ChatReply {
    /// The full response text
    Complete(String),
    /// Fragments as they arrive; concatenating them yields the full text
    Fragments(ReplyStream),
}

impl ChatReply {
    /// Drain the reply into the complete response text.
    ///
    /// Draining a fragment reply consumes the stream to exhaustion, so the
    /// history commit still happens.
    pub async fn into_text(self) -> Result<String> {
        match self {
            ChatReply::Complete(text) => Ok(text),
            ChatReply::Fragments(mut fragments) => {
                let mut text = String::new();
                while let Some(fragment) = fragments.next().await {
                    text.push_str(&fragment?);
                }
                Ok(text)
            }
        }
    }
}

impl std::fmt::Debug for ChatReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatReply::Complete(text) => f.debug_tuple("Complete").field(text).finish(),
            ChatReply::Fragments(_) => f.write_str("Fragments(..)"),
        }
    }
}

/// A conversational client: one turn history in front of one backend.
///
/// At most one call is in flight per client at a time; the history lock is
/// held from dispatch until the reply completes (for fragment replies, until
/// the stream is exhausted or dropped).
pub struct ChatClient {
    backend: Arc<dyn InferenceBackend>,
    history: Arc<Mutex<TurnStore>>,
}

impl ChatClient {
    /// Create a client over an existing backend
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self {
            backend,
            history: Arc::new(Mutex::new(TurnStore::new())),
        }
    }

    /// Create a client from a backend config
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let backend = confab_ai::backends::backend_for(config)?;
        Ok(Self::new(backend))
    }

    /// Send a prompt and return the reply.
    ///
    /// On success the user turn and the assistant turn are appended to the
    /// history, in that order. A failed call leaves the history untouched,
    /// as does a fragment stream the caller abandons before exhaustion.
    pub async fn call(&self, prompt: impl Into<String>, spec: CallSpec) -> Result<ChatReply> {
        let mut history = self.history.clone().lock_owned().await;

        let user_turn = Turn::user(prompt);
        let outgoing = if spec.use_history {
            let mut turns = history.snapshot();
            turns.push(user_turn.clone());
            turns
        } else {
            vec![user_turn.clone()]
        };

        tracing::debug!(
            "dispatching {} turn(s) to {} (streaming: {})",
            outgoing.len(),
            self.backend.name(),
            spec.options.streaming
        );

        let reply = self.backend.send(&outgoing, &spec.options).await?;

        match (reply, spec.options.streaming) {
            (BackendReply::Complete(text), false) => {
                commit(&mut history, user_turn, &text);
                Ok(ChatReply::Complete(text))
            }
            // A backend that answered in one piece under a streaming call:
            // surface it as a single-fragment stream.
            (BackendReply::Complete(text), true) => {
                commit(&mut history, user_turn, &text);
                let fragment: Result<String> = Ok(text);
                Ok(ChatReply::Fragments(Box::pin(tokio_stream::once(fragment))))
            }
            (BackendReply::Fragments(fragments), true) => Ok(ChatReply::Fragments(Box::pin(
                accumulate(history, user_turn, fragments),
            ))),
            // A backend that streamed under a non-streaming call: drain it
            // here and hand back the whole text.
            (BackendReply::Fragments(mut fragments), false) => {
                let mut accumulated = String::new();
                while let Some(fragment) = fragments.next().await {
                    accumulated.push_str(&fragment?);
                }
                commit(&mut history, user_turn, &accumulated);
                Ok(ChatReply::Complete(accumulated))
            }
        }
    }

    /// Clear the stored history. Has no effect on an in-flight call.
    pub async fn reset(&self) {
        self.history.lock().await.reset();
    }

    /// Owned copy of the stored history in order
    pub async fn history(&self) -> Vec<Turn> {
        self.history.lock().await.snapshot()
    }
}

fn commit(history: &mut TurnStore, user_turn: Turn, response: &str) {
    history.append(user_turn);
    history.append(Turn::assistant(response));
}

/// Pass fragments through to the caller while accumulating the full text.
///
/// The history guard rides inside the stream: the turn pair is committed
/// only once the backend's fragments are exhausted, and dropping the stream
/// early releases the guard without committing anything.
fn accumulate(
    mut history: OwnedMutexGuard<TurnStore>,
    user_turn: Turn,
    mut fragments: confab_ai::FragmentStream,
) -> impl Stream<Item = Result<String>> {
    stream! {
        let mut accumulated = String::new();
        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(text) => {
                    accumulated.push_str(&text);
                    yield Ok(text);
                }
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            }
        }
        commit(&mut history, user_turn, &accumulated);
    }
}
