//! Retrieved context - what a chain found before asking the model

use crate::json::to_pretty_json;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Which retrieval pipeline a chain runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// Vector search plus graph fact expansion
    Graph,
    /// Vector search only
    VectorOnly,
}

impl RetrievalMode {
    /// Suffix appended to a route path for this mode
    pub fn route_suffix(&self) -> &'static str {
        match self {
            RetrievalMode::Graph => "",
            RetrievalMode::VectorOnly => "-vector-only",
        }
    }

    /// Human-facing name used on the dashboard
    pub fn label(&self) -> &'static str {
        match self {
            RetrievalMode::Graph => "GraphRAG (vector + graph)",
            RetrievalMode::VectorOnly => "Baseline RAG (vector only)",
        }
    }
}

impl std::fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalMode::Graph => write!(f, "graph"),
            RetrievalMode::VectorOnly => write!(f, "vector_only"),
        }
    }
}

/// Context assembled for one question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RetrievedContext {
    Graph {
        /// Newline-separated fact lines
        facts: String,
        /// Formatted document chunks
        #[serde(rename = "additionalContext")]
        additional_context: String,
        question: String,
    },
    Vector {
        /// Formatted document chunks
        context: String,
        question: String,
    },
}

impl RetrievedContext {
    pub fn mode(&self) -> RetrievalMode {
        match self {
            RetrievedContext::Graph { .. } => RetrievalMode::Graph,
            RetrievedContext::Vector { .. } => RetrievalMode::VectorOnly,
        }
    }

    pub fn question(&self) -> &str {
        match self {
            RetrievedContext::Graph { question, .. } | RetrievedContext::Vector { question, .. } => {
                question
            }
        }
    }

    /// Individual fact lines; empty for vector-only context
    pub fn fact_lines(&self) -> Vec<&str> {
        match self {
            RetrievedContext::Graph { facts, .. } if !facts.is_empty() => facts.split('\n').collect(),
            _ => Vec::new(),
        }
    }

    /// Variables for the answer prompt
    pub fn prompt_variables(&self, chat_history: &str) -> Value {
        match self {
            RetrievedContext::Graph {
                facts,
                additional_context,
                question,
            } => json!({
                "facts": facts,
                "additionalContext": additional_context,
                "question": question,
                "chat_history": chat_history,
            }),
            RetrievedContext::Vector { context, question } => json!({
                "context": context,
                "question": question,
                "chat_history": chat_history,
            }),
        }
    }
}

/// Context reshaped for display next to an answer
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardContext(Value);

impl DashboardContext {
    pub fn from_context(context: &RetrievedContext) -> Self {
        let value = match context {
            RetrievedContext::Graph {
                additional_context, ..
            } => json!({
                "documentContext": parse_or_string(additional_context),
                "graphFacts": context.fact_lines(),
            }),
            RetrievedContext::Vector { context, .. } => parse_or_string(context),
        };
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn to_pretty(&self) -> Result<String> {
        to_pretty_json(&self.0)
    }
}

fn parse_or_string(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_context() -> RetrievedContext {
        RetrievedContext::Graph {
            facts: "A - OWNS -> B\nB - HAS_DOCUMENT -> D".into(),
            additional_context: r#"[{"text": "t", "id": "c1"}]"#.into(),
            question: "Who owns B?".into(),
        }
    }

    #[test]
    fn test_graph_serialization_uses_camel_case_context() {
        let value = serde_json::to_value(graph_context()).unwrap();
        assert_eq!(
            value,
            json!({
                "facts": "A - OWNS -> B\nB - HAS_DOCUMENT -> D",
                "additionalContext": r#"[{"text": "t", "id": "c1"}]"#,
                "question": "Who owns B?"
            })
        );
    }

    #[test]
    fn test_vector_serialization() {
        let context = RetrievedContext::Vector {
            context: "[]".into(),
            question: "q".into(),
        };
        assert_eq!(
            serde_json::to_value(&context).unwrap(),
            json!({"context": "[]", "question": "q"})
        );
        assert_eq!(context.mode(), RetrievalMode::VectorOnly);
    }

    #[test]
    fn test_deserialize_picks_variant() {
        let context: RetrievedContext =
            serde_json::from_value(json!({"context": "[]", "question": "q"})).unwrap();
        assert_eq!(context.mode(), RetrievalMode::VectorOnly);

        let context: RetrievedContext = serde_json::from_value(
            json!({"facts": "", "additionalContext": "[]", "question": "q"}),
        )
        .unwrap();
        assert_eq!(context.mode(), RetrievalMode::Graph);
    }

    #[test]
    fn test_dashboard_graph_context() {
        let dashboard = DashboardContext::from_context(&graph_context());
        assert_eq!(
            dashboard.into_value(),
            json!({
                "documentContext": [{"text": "t", "id": "c1"}],
                "graphFacts": ["A - OWNS -> B", "B - HAS_DOCUMENT -> D"]
            })
        );
    }

    #[test]
    fn test_dashboard_vector_context_keeps_unparseable_text() {
        let context = RetrievedContext::Vector {
            context: "not json".into(),
            question: "q".into(),
        };
        assert_eq!(
            DashboardContext::from_context(&context).into_value(),
            Value::String("not json".into())
        );
    }

    #[test]
    fn test_empty_facts_have_no_lines() {
        let context = RetrievedContext::Graph {
            facts: String::new(),
            additional_context: "[]".into(),
            question: "q".into(),
        };
        assert!(context.fact_lines().is_empty());
    }

    #[test]
    fn test_route_suffix() {
        assert_eq!(RetrievalMode::Graph.route_suffix(), "");
        assert_eq!(RetrievalMode::VectorOnly.route_suffix(), "-vector-only");
    }
}
