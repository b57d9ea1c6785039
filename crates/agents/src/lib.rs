//! Inference clients and chains for SEC GraphRAG
//!
//! This crate contains:
//! - Inference: embedding and chat-completion clients
//! - Condense: folds chat history into a standalone question
//! - QA: GraphRAG and vector-only question answering
//! - Text2Cypher: question to Cypher to answer
//! - Chain: the named chains served over HTTP

pub mod chain;
pub mod condense;
pub mod error;
pub mod inference;
pub mod qa;
pub mod settings;
pub mod text2cypher;

#[cfg(test)]
mod fakes;

pub use chain::{Chain, ChainDeps, ChainRegistry, ValueStream};
pub use error::{AgentError, Result};
pub use inference::{ChatClient, ChatModel, Embedder, EmbeddingClient, TokenStream};
pub use qa::{QaChain, QaStyle};
pub use settings::{EmbeddingSettings, LlmSettings, RetrievalSettings};
pub use text2cypher::{CypherAnswer, Text2CypherChain};
