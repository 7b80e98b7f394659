//! confab-ai: Unified inference backend abstraction
//!
//! This crate provides a common interface for conversational inference
//! backends, with implementations for Google Gemini and the Hugging Face
//! inference router.

pub mod backends;
pub mod error;
pub mod stream;
pub mod types;

pub use backends::InferenceBackend;
pub use error::{Error, Result};
pub use stream::{BackendReply, FragmentStream};
pub use types::*;
