//! Agent error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Database error: {0}")]
    Database(#[from] sec_graphrag_db::DbError),

    #[error("{0}")]
    Core(#[from] sec_graphrag_core::CoreError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AgentError {
    /// Whether the caller, not an upstream service, is at fault
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            AgentError::Core(sec_graphrag_core::CoreError::Validation(_))
                | AgentError::Database(sec_graphrag_db::DbError::WriteRejected(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
