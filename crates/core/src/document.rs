//! Document chunks returned by the vector index

use crate::json::{to_pretty_json, Record};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A chunk of filing text matched by vector similarity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// The chunk text
    pub text: String,

    /// Similarity score reported by the index
    pub score: f32,

    /// Remaining node properties, minus `text`, `embedding` and nulls
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl DocumentChunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            score: 0.0,
            metadata: Map::new(),
        }
    }

    /// Builder pattern: set score
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// Builder pattern: set a metadata property
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Build a chunk from a vector search row `{text, score, metadata}`.
    pub fn from_record(record: &Record) -> Self {
        let text = record
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let score = record.get("score").and_then(Value::as_f64).unwrap_or(0.0) as f32;
        let metadata = match record.get("metadata") {
            Some(Value::Object(map)) => map
                .iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            _ => Map::new(),
        };

        Self {
            text,
            score,
            metadata,
        }
    }

    /// The chunk id used to anchor fact expansion
    pub fn id(&self) -> Option<&str> {
        self.metadata.get("id").and_then(Value::as_str)
    }

    /// `{"text": ..., <metadata...>}` in that order
    pub fn to_formatted(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("text".into(), Value::String(self.text.clone()));
        for (key, value) in &self.metadata {
            doc.insert(key.clone(), value.clone());
        }
        Value::Object(doc)
    }
}

/// Render chunks as the JSON document list handed to the model.
pub fn format_docs(docs: &[DocumentChunk]) -> Result<String> {
    let formatted: Vec<Value> = docs.iter().map(DocumentChunk::to_formatted).collect();
    to_pretty_json(&formatted)
}
