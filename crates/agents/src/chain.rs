//! Chains - the named pipelines served over HTTP
//!
//! Every chain takes a [`ChainInput`] and produces JSON, either all at once
//! or as a stream of chunks. Text chains stream string tokens; context
//! chains emit a single object.

use crate::inference::{ChatClient, ChatModel, Embedder, EmbeddingClient};
use crate::qa::{QaChain, QaStyle};
use crate::settings::{LlmSettings, RetrievalSettings};
use crate::text2cypher::Text2CypherChain;
use crate::Result;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use sec_graphrag_core::{ChainInput, RetrievalMode};
use sec_graphrag_db::{GraphRepository, Neo4jClient};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Output chunks of a streaming chain
pub type ValueStream = BoxStream<'static, Result<Value>>;

/// Services shared by every chain
#[derive(Clone)]
pub struct ChainDeps {
    pub graph: GraphRepository,
    pub embedder: Arc<dyn Embedder>,
    /// Answers and question condensation
    pub llm: Arc<dyn ChatModel>,
    /// Cypher generation
    pub cypher_llm: Arc<dyn ChatModel>,
    pub retrieval: RetrievalSettings,
}

impl ChainDeps {
    /// Connect to Neo4j and the inference APIs as configured in the environment
    pub fn from_env() -> Result<Self> {
        let llm = LlmSettings::from_env();
        Ok(Self {
            graph: GraphRepository::new(Arc::new(Neo4jClient::from_env()?)),
            embedder: Arc::new(EmbeddingClient::from_env()?),
            llm: Arc::new(ChatClient::answer_model(&llm)?),
            cypher_llm: Arc::new(ChatClient::cypher_model(&llm)?),
            retrieval: RetrievalSettings::from_env(),
        })
    }
}

#[async_trait]
pub trait Chain: Send + Sync {
    fn name(&self) -> &str;

    async fn invoke(&self, input: ChainInput) -> Result<Value>;

    async fn stream(&self, input: ChainInput) -> Result<ValueStream>;
}

// ==========================================
// ADAPTERS
// ==========================================

/// Retrieval plus an answer from the model
pub struct AnswerChain {
    name: String,
    qa: QaChain,
}

impl AnswerChain {
    pub fn new(deps: ChainDeps, mode: RetrievalMode, style: QaStyle) -> Self {
        Self {
            name: format!("{}{}", style.route(), mode.route_suffix()),
            qa: QaChain::new(deps, mode, style),
        }
    }
}

#[async_trait]
impl Chain for AnswerChain {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, input: ChainInput) -> Result<Value> {
        Ok(Value::String(self.qa.invoke(&input).await?))
    }

    async fn stream(&self, input: ChainInput) -> Result<ValueStream> {
        let tokens = self.qa.stream(&input).await?;
        Ok(tokens.map(|token| token.map(Value::String)).boxed())
    }
}

/// Retrieval only; returns what the model would have been shown
pub struct ContextChain {
    name: String,
    qa: QaChain,
}

impl ContextChain {
    pub fn new(deps: ChainDeps, mode: RetrievalMode) -> Self {
        Self {
            name: format!("/completion-context{}", mode.route_suffix()),
            qa: QaChain::new(deps, mode, QaStyle::Completion),
        }
    }
}

#[async_trait]
impl Chain for ContextChain {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, input: ChainInput) -> Result<Value> {
        let context = self.qa.retrieve(&input).await?;
        Ok(serde_json::to_value(context).map_err(sec_graphrag_core::CoreError::from)?)
    }

    async fn stream(&self, input: ChainInput) -> Result<ValueStream> {
        let context = self.invoke(input).await?;
        Ok(stream::once(async move { Ok(context) }).boxed())
    }
}

/// Question to Cypher, Cypher to rows, rows to an answer
pub struct CypherChain {
    inner: Text2CypherChain,
}

impl CypherChain {
    pub fn new(deps: ChainDeps) -> Self {
        Self {
            inner: Text2CypherChain::new(deps),
        }
    }
}

#[async_trait]
impl Chain for CypherChain {
    fn name(&self) -> &str {
        "/text2cypher"
    }

    async fn invoke(&self, input: ChainInput) -> Result<Value> {
        Ok(Value::String(self.inner.invoke(&input).await?))
    }

    async fn stream(&self, input: ChainInput) -> Result<ValueStream> {
        let tokens = self.inner.stream(&input).await?;
        Ok(tokens.map(|token| token.map(Value::String)).boxed())
    }
}

// ==========================================
// REGISTRY
// ==========================================

/// Route path to chain
#[derive(Clone, Default)]
pub struct ChainRegistry {
    chains: BTreeMap<String, Arc<dyn Chain>>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every QA, context and text2cypher chain over the same services
    pub fn standard(deps: ChainDeps) -> Self {
        let mut registry = Self::new();
        let modes = [RetrievalMode::Graph, RetrievalMode::VectorOnly];

        for style in QaStyle::ALL {
            for mode in modes {
                registry.register(Arc::new(AnswerChain::new(deps.clone(), mode, style)));
            }
        }
        for mode in modes {
            registry.register(Arc::new(ContextChain::new(deps.clone(), mode)));
        }
        registry.register(Arc::new(CypherChain::new(deps)));

        info!("Registered {} chains", registry.chains.len());
        registry
    }

    /// Add a chain under its own name, replacing any chain already there
    pub fn register(&mut self, chain: Arc<dyn Chain>) -> &mut Self {
        self.chains.insert(chain.name().to_string(), chain);
        self
    }

    pub fn get(&self, path: &str) -> Option<Arc<dyn Chain>> {
        self.chains.get(path).cloned()
    }

    /// Registered paths, sorted
    pub fn paths(&self) -> Vec<String> {
        self.chains.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeChatModel, FakeEmbedder, FakeGraph};
    use sec_graphrag_core::RetrievedContext;
    use serde_json::json;

    fn deps(replies: &[&str]) -> ChainDeps {
        let graph = Arc::new(FakeGraph::new(
            vec![json!({"text": "Apple relies on TSMC.", "score": 0.9, "metadata": {"id": "c1"}})],
            vec![json!({"fact": "BLACKROCK INC - OWNS -> APPLE INC"})],
            vec![json!({"companyName": "APPLE INC"})],
        ));
        let llm = Arc::new(FakeChatModel::replying(replies.iter().copied()));
        ChainDeps {
            graph: GraphRepository::new(graph),
            embedder: Arc::new(FakeEmbedder::new()),
            llm: llm.clone(),
            cypher_llm: llm,
            retrieval: RetrievalSettings::default(),
        }
    }

    #[test]
    fn test_standard_paths() {
        let registry = ChainRegistry::standard(deps(&["answer"]));
        assert_eq!(
            registry.paths(),
            vec![
                "/assistant",
                "/assistant-vector-only",
                "/chat",
                "/chat-vector-only",
                "/completion",
                "/completion-context",
                "/completion-context-vector-only",
                "/completion-vector-only",
                "/text2cypher",
            ]
        );
        assert!(registry.get("/text2cypher-vector-only").is_none());
    }

    #[tokio::test]
    async fn test_context_chain_returns_graph_context() {
        let registry = ChainRegistry::standard(deps(&["unused"]));
        let chain = registry.get("/completion-context").unwrap();

        let value = chain.invoke(ChainInput::question("Who owns Apple?")).await.unwrap();
        assert_eq!(value["facts"], json!("BLACKROCK INC - OWNS -> APPLE INC"));
        assert_eq!(value["question"], json!("Who owns Apple?"));

        let context: RetrievedContext = serde_json::from_value(value).unwrap();
        assert_eq!(context.mode(), RetrievalMode::Graph);
    }

    #[tokio::test]
    async fn test_context_chain_streams_one_chunk() {
        let registry = ChainRegistry::standard(deps(&["unused"]));
        let chain = registry.get("/completion-context-vector-only").unwrap();

        let chunks: Vec<Value> = chain
            .stream(ChainInput::question("Who owns Apple?"))
            .await
            .unwrap()
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].get("context").is_some());
        assert!(chunks[0].get("facts").is_none());
    }

    #[tokio::test]
    async fn test_answer_chain_streams_strings() {
        let registry = ChainRegistry::standard(deps(&["BlackRock owns Apple"]));
        let chain = registry.get("/completion").unwrap();

        let chunks: Vec<Value> = chain
            .stream(ChainInput::question("Who owns Apple?"))
            .await
            .unwrap()
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;

        assert!(chunks.iter().all(Value::is_string));
        let text: String = chunks.iter().filter_map(Value::as_str).collect();
        assert_eq!(text, "BlackRock owns Apple");
    }

    #[tokio::test]
    async fn test_cypher_chain_invoke() {
        let registry = ChainRegistry::standard(deps(&["MATCH (c:Company) RETURN c.companyName AS companyName"]));
        let chain = registry.get("/text2cypher").unwrap();

        // One fake model writes the query and the summary, so the answer echoes it
        let value = chain.invoke(ChainInput::question("List companies")).await.unwrap();
        assert_eq!(value, json!("MATCH (c:Company) RETURN c.companyName AS companyName"));
    }
}
