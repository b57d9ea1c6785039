//! Chain input records - the question and the conversation around it

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// One exchange of a conversation: what the human asked, what the assistant answered.
///
/// Serializes as a two-element array, `["question", "answer"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn(pub String, pub String);

impl ChatTurn {
    pub fn new(human: impl Into<String>, ai: impl Into<String>) -> Self {
        Self(human.into(), ai.into())
    }

    pub fn human(&self) -> &str {
        &self.0
    }

    pub fn ai(&self) -> &str {
        &self.1
    }
}

/// Input accepted by every chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInput {
    /// The question as the user typed it
    pub input: String,

    /// Prior turns, oldest first
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

impl ChainInput {
    /// A single question with no conversation history
    pub fn question(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            chat_history: Vec::new(),
        }
    }

    /// Builder pattern: attach chat history
    pub fn with_history(mut self, chat_history: Vec<ChatTurn>) -> Self {
        self.chat_history = chat_history;
        self
    }

    pub fn has_history(&self) -> bool {
        !self.chat_history.is_empty()
    }

    /// Reject blank questions
    pub fn validate(&self) -> Result<()> {
        if self.input.trim().is_empty() {
            return Err(CoreError::Validation("question cannot be empty".into()));
        }
        Ok(())
    }
}

/// Wire shape of a chain input: either a bare question string or a full record.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChainRequest {
    Question(String),
    Structured(ChainInput),
}

impl ChainRequest {
    /// Convert into a validated [`ChainInput`]
    pub fn into_input(self) -> Result<ChainInput> {
        let input = match self {
            ChainRequest::Question(question) => ChainInput::question(question),
            ChainRequest::Structured(input) => input,
        };
        input.validate()?;
        Ok(input)
    }
}

/// Render history as alternating `Human:` / `Assistant:` lines.
pub fn format_chat_history(history: &[ChatTurn]) -> String {
    history
        .iter()
        .map(|turn| format!("Human: {}\nAssistant: {}", turn.human(), turn.ai()))
        .collect::<Vec<_>>()
        .join("\n")
}
