//! Clients for the hosted embedding and chat-completion APIs

use crate::settings::{EmbeddingProvider, EmbeddingSettings, LlmSettings};
use crate::{AgentError, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, instrument};

/// Incremental answer tokens
pub type TokenStream = BoxStream<'static, Result<String>>;

/// Turns text into a vector for similarity search
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// A chat model that answers a fully rendered prompt
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Wait for the whole answer
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Answer token by token
    async fn stream(&self, prompt: &str) -> Result<TokenStream>;
}

// ==========================================
// EMBEDDINGS
// ==========================================

#[derive(Clone)]
pub struct EmbeddingClient {
    client: Client,
    provider: EmbeddingProvider,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl EmbeddingClient {
    pub fn new(settings: &EmbeddingSettings) -> Self {
        Self {
            client: Client::new(),
            provider: settings.provider,
            base_url: settings.url.clone(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(&EmbeddingSettings::from_env()?))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<bool> {
        let response = match self.provider {
            EmbeddingProvider::Tei => {
                self.client
                    .get(format!("{}/health", self.base_url))
                    .send()
                    .await?
            }
            EmbeddingProvider::OpenAi => {
                self.client
                    .get(format!("{}/models", self.base_url))
                    .bearer_auth(self.api_key.as_deref().unwrap_or_default())
                    .send()
                    .await?
            }
        };
        Ok(response.status().is_success())
    }

    async fn openai_embed(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AgentError::Config("OPENAI_API_KEY is not set".into()))?;

        let request = OpenAiEmbedRequest {
            model: &self.model,
            input: text,
        };

        let response: OpenAiEmbedResponse = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| AgentError::Embedding("No embedding returned".into()))
    }

    async fn tei_embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = TeiEmbedRequest {
            inputs: text,
            truncate: true,
        };

        let response = self
            .client
            .post(format!("{}/embed", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        parse_embedding_response(response)
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = match self.provider {
            EmbeddingProvider::OpenAi => self.openai_embed(text).await?,
            EmbeddingProvider::Tei => self.tei_embed(text).await?,
        };
        if embedding.is_empty() {
            return Err(AgentError::Embedding("Empty embedding returned".into()));
        }
        debug!("Embedding dimension {}", embedding.len());
        Ok(embedding)
    }
}

/// TEI answers `[[...]]` for a single input; older builds answer `[...]`.
fn parse_embedding_response(value: Value) -> Result<Vec<f32>> {
    let vector = match value {
        Value::Array(mut items) if matches!(items.first(), Some(Value::Array(_))) => items.swap_remove(0),
        other => other,
    };
    serde_json::from_value(vector)
        .map_err(|e| AgentError::Embedding(format!("Unexpected embedding response: {}", e)))
}

// ==========================================
// CHAT COMPLETIONS
// ==========================================

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl ChatClient {
    /// `settings.timeout` bounds connecting and each read; only `complete` also bounds the whole exchange
    pub fn new(settings: &LlmSettings, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(settings.timeout)
            .read_timeout(settings.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            api_key: settings.require_api_key()?.to_string(),
            model: model.into(),
            temperature: settings.temperature,
            timeout: settings.timeout,
        })
    }

    /// Model used for answers and question condensation
    pub fn answer_model(settings: &LlmSettings) -> Result<Self> {
        Self::new(settings, settings.model.clone())
    }

    /// Model used to write Cypher
    pub fn cypher_model(settings: &LlmSettings) -> Result<Self> {
        Self::new(settings, settings.cypher_model.clone())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn health(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    fn request<'a>(&'a self, prompt: &'a str, stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            stream,
        }
    }

    async fn send(&self, request: &ChatRequest<'_>, total: Option<Duration>) -> Result<reqwest::Response> {
        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key);
        if let Some(total) = total {
            builder = builder.timeout(total);
        }

        let response = builder.json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Llm(format!("{} returned {}: {}", self.model, status, body)));
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    #[instrument(skip(self, prompt), fields(model = %self.model, chars = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response: ChatResponse = self
            .send(&self.request(prompt, false), Some(self.timeout))
            .await?
            .json()
            .await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AgentError::Llm("No choices returned".into()))
    }

    #[instrument(skip(self, prompt), fields(model = %self.model, chars = prompt.len()))]
    async fn stream(&self, prompt: &str) -> Result<TokenStream> {
        // Streams may outlast the timeout as long as chunks keep arriving
        let response = self.send(&self.request(prompt, true), None).await?;
        Ok(sse_tokens(response.bytes_stream().boxed()))
    }
}

/// Decode an OpenAI-style server-sent-event body into answer tokens.
fn sse_tokens(bytes: BoxStream<'static, reqwest::Result<bytes::Bytes>>) -> TokenStream {
    struct State {
        bytes: BoxStream<'static, reqwest::Result<bytes::Bytes>>,
        decoder: SseDecoder,
        pending: VecDeque<String>,
        done: bool,
    }

    let state = State {
        bytes,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(token) = state.pending.pop_front() {
                return Some((Ok(token), state));
            }
            if state.done {
                return None;
            }

            let lines = match state.bytes.next().await {
                Some(Ok(chunk)) => state.decoder.push(&chunk),
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(AgentError::Http(e)), state));
                }
                None => {
                    state.done = true;
                    state.decoder.finish()
                }
            };

            for line in lines {
                match parse_sse_data(&line) {
                    Ok(SseData::Token(token)) => state.pending.push_back(token),
                    Ok(SseData::Done) => {
                        state.done = true;
                        break;
                    }
                    Ok(SseData::Ignore) => {}
                    Err(e) => {
                        state.done = true;
                        return Some((Err(e), state));
                    }
                }
            }
        }
    })
    .boxed()
}

/// Splits a byte stream into complete lines without breaking UTF-8 sequences
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line).trim_end_matches(['\r', '\n']).to_string());
        }
        lines
    }

    fn finish(&mut self) -> Vec<String> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        let line = String::from_utf8_lossy(&self.buffer).trim_end().to_string();
        self.buffer.clear();
        vec![line]
    }
}

/// One decoded `data:` line
#[derive(Debug, PartialEq, Eq)]
pub enum SseData {
    Token(String),
    Done,
    Ignore,
}

/// Parse a single server-sent-event line from a streaming completion.
pub fn parse_sse_data(line: &str) -> Result<SseData> {
    let payload = match line.strip_prefix("data:") {
        Some(payload) => payload.trim(),
        None => return Ok(SseData::Ignore),
    };
    if payload == "[DONE]" {
        return Ok(SseData::Done);
    }
    if payload.is_empty() {
        return Ok(SseData::Ignore);
    }

    let chunk: StreamChunk = serde_json::from_str(payload)
        .map_err(|e| AgentError::Llm(format!("Malformed stream chunk: {} ({})", payload, e)))?;
    if let Some(error) = chunk.error {
        return Err(AgentError::Llm(error.to_string()));
    }

    let token = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .unwrap_or_default();
    if token.is_empty() {
        Ok(SseData::Ignore)
    } else {
        Ok(SseData::Token(token))
    }
}

// ==========================================
// REQUEST/RESPONSE TYPES
// ==========================================

#[derive(Debug, Serialize)]
struct OpenAiEmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct TeiEmbedRequest<'a> {
    inputs: &'a str,
    truncate: bool,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}
