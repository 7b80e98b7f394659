//! Fragment stream types and utilities

use std::pin::Pin;

use futures::StreamExt;
use tokio_stream::Stream;

use crate::error::Result;

/// A producible-once, forward-only sequence of response fragments.
///
/// `Ok` items concatenate, in emission order, to the complete response text.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// What a backend hands back for one request
pub enum BackendReply {
    /// The full response in one piece
    Complete(String),
    /// An incremental fragment stream, finite and not restartable
    Fragments(FragmentStream),
}

impl BackendReply {
    /// Drain the reply into the complete response text.
    ///
    /// For a fragment reply this consumes the stream, concatenating every
    /// fragment; the first fragment error aborts the drain.
    pub async fn into_text(self) -> Result<String> {
        match self {
            BackendReply::Complete(text) => Ok(text),
            BackendReply::Fragments(mut fragments) => {
                let mut text = String::new();
                while let Some(fragment) = fragments.next().await {
                    text.push_str(&fragment?);
                }
                Ok(text)
            }
        }
    }
}

impl std::fmt::Debug for BackendReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendReply::Complete(text) => f.debug_tuple("Complete").field(text).finish(),
            BackendReply::Fragments(_) => f.write_str("Fragments(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[tokio::test]
    async fn test_into_text_complete() {
        let reply = BackendReply::Complete("Hello!".to_string());
        assert_eq!(reply.into_text().await.unwrap(), "Hello!");
    }

    #[tokio::test]
    async fn test_into_text_concatenates_fragments_in_order() {
        let fragments = vec![Ok("Hel".to_string()), Ok("lo".to_string()), Ok("!".to_string())];
        let reply = BackendReply::Fragments(Box::pin(tokio_stream::iter(fragments)));
        assert_eq!(reply.into_text().await.unwrap(), "Hello!");
    }

    #[tokio::test]
    async fn test_into_text_empty_fragments_are_noops() {
        let fragments = vec![Ok(String::new()), Ok("Hi".to_string()), Ok(String::new())];
        let reply = BackendReply::Fragments(Box::pin(tokio_stream::iter(fragments)));
        assert_eq!(reply.into_text().await.unwrap(), "Hi");
    }

    #[tokio::test]
    async fn test_into_text_propagates_fragment_error() {
        let fragments = vec![
            Ok("partial".to_string()),
            Err(Error::Sse("connection reset".into())),
        ];
        let reply = BackendReply::Fragments(Box::pin(tokio_stream::iter(fragments)));
        assert!(matches!(reply.into_text().await, Err(Error::Sse(_))));
    }
}
