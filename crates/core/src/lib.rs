//! Core domain types for the SEC GraphRAG service
//!
//! This crate defines the records that flow through the chains: chain
//! inputs, document chunks, retrieved context, and the prompt templates
//! that turn them into model input.

pub mod chat;
pub mod context;
pub mod document;
pub mod error;
pub mod json;
pub mod prompt;

pub use chat::{format_chat_history, ChainInput, ChainRequest, ChatTurn};
pub use context::{DashboardContext, RetrievalMode, RetrievedContext};
pub use document::{format_docs, DocumentChunk};
pub use error::{CoreError, Result};
pub use json::{remove_keys, to_pretty_json, Record};
pub use prompt::PromptTemplate;
