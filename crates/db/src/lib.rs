//! Graph database layer for the SEC GraphRAG service
//!
//! Talks to Neo4j over its HTTP API. The same database holds the knowledge
//! graph and the vector index over filing chunks; this crate only reads.

pub mod client;
pub mod config;
pub mod error;
pub mod queries;
pub mod repository;

pub use client::{GraphStore, Neo4jClient};
pub use config::Neo4jConfig;
pub use error::{DbError, Result};
pub use repository::{ensure_read_only, GraphRepository, GraphStats};
