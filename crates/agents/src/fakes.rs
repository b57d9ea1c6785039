//! In-memory stand-ins for the graph, embedding and chat services

use crate::{ChatModel, Embedder, Result, TokenStream};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use sec_graphrag_core::Record;
use sec_graphrag_db::queries::{FACT_EXPANSION, VECTOR_SEARCH};
use sec_graphrag_db::GraphStore;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

pub struct FakeEmbedder {
    texts: Mutex<Vec<String>>,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self {
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(vec![0.1, 0.2, 0.3])
    }
}

/// Replies with canned answers in order, repeating the last one
pub struct FakeChatModel {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeChatModel {
    pub fn replying<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn next_reply(&self, prompt: &str) -> String {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut replies = self.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front().unwrap_or_default()
        } else {
            replies.front().cloned().unwrap_or_default()
        }
    }
}

#[async_trait]
impl ChatModel for FakeChatModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        Ok(self.next_reply(prompt))
    }

    async fn stream(&self, prompt: &str) -> Result<TokenStream> {
        let reply = self.next_reply(prompt);
        let tokens: Vec<Result<String>> = reply
            .split_inclusive(' ')
            .map(|token| Ok(token.to_string()))
            .collect();
        Ok(stream::iter(tokens).boxed())
    }
}

/// Answers the vector and fact queries with canned rows; anything else gets `other_rows`
pub struct FakeGraph {
    pub chunk_rows: Vec<Record>,
    pub fact_rows: Vec<Record>,
    pub other_rows: Vec<Record>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl FakeGraph {
    pub fn new(chunk_rows: Vec<Value>, fact_rows: Vec<Value>, other_rows: Vec<Value>) -> Self {
        let records = |rows: Vec<Value>| -> Vec<Record> {
            rows.into_iter().filter_map(|row| row.as_object().cloned()).collect()
        };
        Self {
            chunk_rows: records(chunk_rows),
            fact_rows: records(fact_rows),
            other_rows: records(other_rows),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphStore for FakeGraph {
    async fn query(&self, cypher: &str, params: Value) -> sec_graphrag_db::Result<Vec<Record>> {
        self.calls.lock().unwrap().push((cypher.to_string(), params));
        Ok(if cypher == VECTOR_SEARCH {
            self.chunk_rows.clone()
        } else if cypher == FACT_EXPANSION {
            self.fact_rows.clone()
        } else {
            self.other_rows.clone()
        })
    }
}
