//! HTTP surface for the SEC GraphRAG chains
//!
//! - Routes: invoke/batch/stream for every registered chain
//! - Dashboard: the vector-only vs GraphRAG comparison page
//! - App: router assembly and the server loop

pub mod app;
pub mod dashboard;
pub mod error;
pub mod routes;

pub use app::{AppBuilder, AppState, Server, ServerConfig};
pub use error::{ApiError, JsonError, Result};
