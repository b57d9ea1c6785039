//! HTTP client for Neo4j's transactional Cypher endpoint

use crate::{DbError, Neo4jConfig, Result};
use async_trait::async_trait;
use reqwest::Client;
use sec_graphrag_core::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

/// Header selecting the transaction access mode on the HTTP API
const ACCESS_MODE_HEADER: &str = "access-mode";

/// Anything that can run a parameterized Cypher query and hand back rows
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn query(&self, cypher: &str, params: Value) -> Result<Vec<Record>>;

    /// Run a query the store itself should refuse to let write
    async fn query_read(&self, cypher: &str, params: Value) -> Result<Vec<Record>> {
        self.query(cypher, params).await
    }
}

/// Neo4j over HTTP
#[derive(Clone)]
pub struct Neo4jClient {
    client: Client,
    endpoint: String,
    commit_url: String,
    username: String,
    password: String,
}

impl Neo4jClient {
    pub fn new(config: &Neo4jConfig) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            endpoint: config.http_endpoint()?,
            commit_url: config.commit_url()?,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Client configured from `NEO4J_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(&Neo4jConfig::from_env()?)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Health check against the discovery document
    pub async fn health(&self) -> Result<bool> {
        let response = self
            .client
            .get(&self.endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;
        Ok(response.status().is_success())
    }

    async fn commit(&self, cypher: &str, params: Value, read_only: bool) -> Result<Vec<Record>> {
        let request = TxRequest {
            statements: vec![Statement {
                statement: cypher,
                parameters: params,
            }],
        };

        let mut builder = self
            .client
            .post(&self.commit_url)
            .basic_auth(&self.username, Some(&self.password));
        if read_only {
            builder = builder.header(ACCESS_MODE_HEADER, "READ");
        }

        let response: TxResponse = builder
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let records = response.into_records()?;
        debug!("Query returned {} rows", records.len());
        Ok(records)
    }
}

#[async_trait]
impl GraphStore for Neo4jClient {
    #[instrument(skip(self, params))]
    async fn query(&self, cypher: &str, params: Value) -> Result<Vec<Record>> {
        self.commit(cypher, params, false).await
    }

    /// Runs in a READ transaction, so the server rejects any write
    #[instrument(skip(self, params))]
    async fn query_read(&self, cypher: &str, params: Value) -> Result<Vec<Record>> {
        self.commit(cypher, params, true).await
    }
}

// ==========================================
// REQUEST/RESPONSE TYPES
// ==========================================

#[derive(Debug, Serialize)]
struct TxRequest<'a> {
    statements: Vec<Statement<'a>>,
}

#[derive(Debug, Serialize)]
struct Statement<'a> {
    statement: &'a str,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TxResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<Neo4jErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<RowData>,
}

#[derive(Debug, Deserialize)]
struct RowData {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Neo4jErrorBody {
    code: String,
    message: String,
}

impl TxResponse {
    /// Zip each row with its column names. A reported error wins over any rows.
    pub(crate) fn into_records(self) -> Result<Vec<Record>> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(DbError::Neo4j {
                code: error.code,
                message: error.message,
            });
        }

        let result = match self.results.into_iter().next() {
            Some(result) => result,
            None => return Ok(Vec::new()),
        };

        let columns = result.columns;
        Ok(result
            .data
            .into_iter()
            .map(|data| columns.iter().cloned().zip(data.row).collect::<Record>())
            .collect())
    }
}
