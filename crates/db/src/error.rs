//! Database error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Invalid Neo4j URI: {0}")]
    InvalidUri(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Neo4j error {code}: {message}")]
    Neo4j { code: String, message: String },

    #[error("Refusing to run a query that writes to the graph: {0}")]
    WriteRejected(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Core error: {0}")]
    Core(#[from] sec_graphrag_core::CoreError),
}

pub type Result<T> = std::result::Result<T, DbError>;
