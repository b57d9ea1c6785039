//! Neo4j connection settings

use crate::{DbError, Result};

const DEFAULT_USERNAME: &str = "neo4j";
const DEFAULT_DATABASE: &str = "neo4j";
const BOLT_PORT: u16 = 7687;
const HTTP_PORT: u16 = 7474;
const HTTPS_PORT: u16 = 7473;

/// Where and how to reach the graph database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neo4jConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl Neo4jConfig {
    pub fn new(uri: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            username: username.into(),
            password: password.into(),
            database: DEFAULT_DATABASE.to_string(),
        }
    }

    /// Builder pattern: set database name
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Read `NEO4J_URI`, `NEO4J_USERNAME`, `NEO4J_PASSWORD` and `NEO4J_DATABASE`.
    pub fn from_env() -> Result<Self> {
        let uri = required_env("NEO4J_URI")?;
        let password = required_env("NEO4J_PASSWORD")?;
        let username = std::env::var("NEO4J_USERNAME").unwrap_or_else(|_| DEFAULT_USERNAME.to_string());
        let database = std::env::var("NEO4J_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE.to_string());

        Ok(Self {
            uri,
            username,
            password,
            database,
        })
    }

    /// Base URL of the HTTP API.
    ///
    /// Bolt-style URIs are mapped onto the HTTP connector of the same host:
    /// encrypted schemes go to https, plain schemes to http on 7474.
    pub fn http_endpoint(&self) -> Result<String> {
        let uri = self.uri.trim().trim_end_matches('/');
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| DbError::InvalidUri(self.uri.clone()))?;

        let (host, port) = split_host_port(rest).ok_or_else(|| DbError::InvalidUri(self.uri.clone()))?;

        match scheme.to_ascii_lowercase().as_str() {
            "http" | "https" => Ok(uri.to_string()),
            "neo4j+s" | "neo4j+ssc" | "bolt+s" | "bolt+ssc" => Ok(match port {
                Some(BOLT_PORT) => format!("https://{}:{}", host, HTTPS_PORT),
                Some(port) => format!("https://{}:{}", host, port),
                None => format!("https://{}", host),
            }),
            "neo4j" | "bolt" => {
                let port = match port {
                    None | Some(BOLT_PORT) => HTTP_PORT,
                    Some(port) => port,
                };
                Ok(format!("http://{}:{}", host, port))
            }
            _ => Err(DbError::InvalidUri(self.uri.clone())),
        }
    }

    /// Transactional endpoint that runs statements in a single auto-committed transaction
    pub fn commit_url(&self) -> Result<String> {
        Ok(format!("{}/db/{}/tx/commit", self.http_endpoint()?, self.database))
    }
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| DbError::MissingConfig(key.to_string()))
}

fn split_host_port(authority: &str) -> Option<(&str, Option<u16>)> {
    let authority = authority.split('/').next()?;
    if authority.is_empty() {
        return None;
    }
    match authority.rsplit_once(':') {
        Some((host, port)) => Some((host, Some(port.parse().ok()?))),
        None => Some((authority, None)),
    }
}
