//! Common test utilities

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use sec_graphrag_agents::{AgentError, Chain, ChainRegistry, Result, ValueStream};
use sec_graphrag_core::ChainInput;
use sec_graphrag_server::AppBuilder;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Answers with the question, streamed word by word
pub struct EchoChain(pub &'static str);

#[async_trait]
impl Chain for EchoChain {
    fn name(&self) -> &str {
        self.0
    }

    async fn invoke(&self, input: ChainInput) -> Result<Value> {
        Ok(json!(format!("echo: {}", input.input)))
    }

    async fn stream(&self, input: ChainInput) -> Result<ValueStream> {
        let answer = format!("echo: {}", input.input);
        let chunks: Vec<Result<Value>> = answer
            .split_inclusive(' ')
            .map(|token| Ok(json!(token)))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }
}

/// Returns a fixed retrieved context
pub struct ContextChain {
    pub name: &'static str,
    pub context: Value,
}

#[async_trait]
impl Chain for ContextChain {
    fn name(&self) -> &str {
        self.name
    }

    async fn invoke(&self, _input: ChainInput) -> Result<Value> {
        Ok(self.context.clone())
    }

    async fn stream(&self, input: ChainInput) -> Result<ValueStream> {
        let context = self.invoke(input).await?;
        Ok(stream::once(async move { Ok(context) }).boxed())
    }
}

/// Fails upstream; streams one token before failing
pub struct FailingChain(pub &'static str);

#[async_trait]
impl Chain for FailingChain {
    fn name(&self) -> &str {
        self.0
    }

    async fn invoke(&self, _input: ChainInput) -> Result<Value> {
        Err(AgentError::Llm("model unavailable".into()))
    }

    async fn stream(&self, _input: ChainInput) -> Result<ValueStream> {
        let chunks: Vec<Result<Value>> = vec![
            Ok(json!("partial ")),
            Err(AgentError::Llm("model unavailable".into())),
        ];
        Ok(stream::iter(chunks).boxed())
    }
}

/// Registry with the chains the dashboard and route tests use
pub fn test_registry() -> ChainRegistry {
    let mut registry = ChainRegistry::new();
    registry
        .register(Arc::new(EchoChain("/completion")))
        .register(Arc::new(EchoChain("/completion-vector-only")))
        .register(Arc::new(FailingChain("/broken")))
        .register(Arc::new(ContextChain {
            name: "/completion-context",
            context: json!({
                "facts": "BLACKROCK INC - OWNS -> NVIDIA CORP\nVANGUARD GROUP INC - OWNS -> NVIDIA CORP",
                "additionalContext": "[\n {\n  \"text\": \"NVIDIA designs GPUs.\",\n  \"id\": \"c1\"\n }\n]",
                "question": "q",
            }),
        }))
        .register(Arc::new(FailingChain("/completion-context-vector-only")));
    registry
}

/// Serve the app on an ephemeral port and return its base URL
pub async fn spawn_app(registry: ChainRegistry) -> String {
    let app = AppBuilder::new(Arc::new(registry))
        .expect("Failed to build app")
        .build();
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });

    format!("http://{}", addr)
}

/// A parsed server-sent event
#[derive(Debug, PartialEq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Split an SSE body into events, skipping keep-alive comments
pub fn parse_sse(body: &str) -> Vec<SseEvent> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data = Vec::new();
            for line in block.lines() {
                if let Some(name) = line.strip_prefix("event:") {
                    event = Some(name.trim().to_string());
                } else if let Some(value) = line.strip_prefix("data:") {
                    data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
                }
            }
            event.map(|event| SseEvent {
                event,
                data: data.join("\n"),
            })
        })
        .collect()
}
