//! Environment-driven settings for the inference services and retrieval

use crate::{AgentError, Result};
use std::time::Duration;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_ANSWER_MODEL: &str = "gpt-4o";
const DEFAULT_CYPHER_MODEL: &str = "gpt-4";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_TEI_URL: &str = "http://localhost:8081";
const DEFAULT_VECTOR_INDEX: &str = "vector";
const DEFAULT_TOP_K: usize = 10;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

fn env_or_default(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.trim().parse::<T>().ok())
}

/// Chat-completion settings
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Model that writes answers and condenses questions
    pub model: String,
    /// Model that writes Cypher
    pub cypher_model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_ANSWER_MODEL.to_string(),
            cypher_model: DEFAULT_CYPHER_MODEL.to_string(),
            temperature: 0.0,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl LlmSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|key| !key.trim().is_empty()),
            base_url: env_or_default("OPENAI_BASE_URL", &defaults.base_url)
                .trim_end_matches('/')
                .to_string(),
            model: env_or_default("OPENAI_MODEL", &defaults.model),
            cypher_model: env_or_default("OPENAI_CYPHER_MODEL", &defaults.cypher_model),
            temperature: env_parse("LLM_TEMPERATURE").unwrap_or(defaults.temperature),
            timeout: env_parse("LLM_TIMEOUT_SECS")
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// The API key, or a configuration error naming the variable
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AgentError::Config("OPENAI_API_KEY is not set".into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// OpenAI-compatible `/embeddings`
    OpenAi,
    /// Hugging Face text-embeddings-inference `/embed`
    Tei,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = AgentError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(EmbeddingProvider::OpenAi),
            "tei" => Ok(EmbeddingProvider::Tei),
            other => Err(AgentError::Config(format!("unknown embedding provider: {}", other))),
        }
    }
}

/// Embedding service settings
#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl EmbeddingSettings {
    pub fn from_env() -> Result<Self> {
        let provider: EmbeddingProvider = env_or_default("EMBEDDING_PROVIDER", "openai").parse()?;
        let url = match provider {
            EmbeddingProvider::OpenAi => env_or_default(
                "EMBEDDING_URL",
                &env_or_default("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            ),
            EmbeddingProvider::Tei => env_or_default("EMBEDDING_URL", DEFAULT_TEI_URL),
        };

        Ok(Self {
            provider,
            url: url.trim_end_matches('/').to_string(),
            model: env_or_default("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|key| !key.trim().is_empty()),
        })
    }
}

/// Vector index settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalSettings {
    pub index_name: String,
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            index_name: DEFAULT_VECTOR_INDEX.to_string(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl RetrievalSettings {
    pub fn from_env() -> Self {
        Self {
            index_name: env_or_default("VECTOR_INDEX_NAME", DEFAULT_VECTOR_INDEX),
            top_k: env_parse("VECTOR_TOP_K")
                .filter(|k: &usize| *k > 0)
                .unwrap_or(DEFAULT_TOP_K),
        }
    }
}
