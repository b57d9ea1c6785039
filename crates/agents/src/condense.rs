//! Question condensation - fold chat history into a standalone question

use crate::{ChatModel, Result};
use sec_graphrag_core::prompt::CONDENSE_QUESTION;
use sec_graphrag_core::{format_chat_history, ChainInput};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct CondenseQuestion {
    llm: Arc<dyn ChatModel>,
}

impl CondenseQuestion {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self { llm }
    }

    /// The question to search with. Without history this is the input as-is.
    #[instrument(skip(self, input), fields(turns = input.chat_history.len()))]
    pub async fn standalone(&self, input: &ChainInput) -> Result<String> {
        if !input.has_history() {
            return Ok(input.input.clone());
        }

        let prompt = CONDENSE_QUESTION.render(json!({
            "chat_history": format_chat_history(&input.chat_history),
            "question": input.input,
        }))?;

        let condensed = self.llm.complete(&prompt).await?.trim().to_string();
        debug!("Condensed question: {}", condensed);

        // A model that answers with nothing should not blank the search
        if condensed.is_empty() {
            return Ok(input.input.clone());
        }
        Ok(condensed)
    }
}
