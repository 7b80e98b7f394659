//! confab-chat: Conversational client over inference backends
//!
//! This crate keeps an ordered turn history for one conversation and
//! presents a single call contract over any [`confab_ai::InferenceBackend`],
//! normalizing streaming and non-streaming replies to the same behavior.

pub mod client;
pub mod error;
pub mod history;

pub use client::{CallSpec, ChatClient, ChatReply, ReplyStream};
pub use error::{Error, Result};
pub use history::TurnStore;
