//! Natural language to Cypher, and query results back to natural language

use crate::chain::ChainDeps;
use crate::{Result, TokenStream};
use sec_graphrag_core::prompt::{RESULTS_TO_LANGUAGE, TEXT2CYPHER};
use sec_graphrag_core::{remove_keys, to_pretty_json, ChainInput};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

/// Keys dropped from query results before they reach the model
const HIDDEN_KEYS: [&str; 1] = ["embedding"];

/// A text2cypher answer and the query behind it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CypherAnswer {
    pub cypher: String,
    pub answer: String,
}

#[derive(Clone)]
pub struct Text2CypherChain {
    deps: ChainDeps,
}

impl Text2CypherChain {
    pub fn new(deps: ChainDeps) -> Self {
        Self { deps }
    }

    /// Ask the Cypher model for a query answering `question`
    #[instrument(skip(self))]
    pub async fn generate_cypher(&self, question: &str) -> Result<String> {
        let prompt = TEXT2CYPHER.render(json!({ "input": question }))?;
        let raw = self.deps.cypher_llm.complete(&prompt).await?;
        let cypher = strip_code_fences(&raw);
        debug!("Generated Cypher: {}", cypher);
        Ok(cypher)
    }

    /// Generate a query, run it, and render the rows as JSON
    #[instrument(skip(self))]
    pub async fn query_context(&self, question: &str) -> Result<String> {
        let cypher = self.generate_cypher(question).await?;
        self.run_cypher(&cypher).await
    }

    /// Answer along with the Cypher that produced it
    pub async fn answer(&self, input: &ChainInput) -> Result<CypherAnswer> {
        let (cypher, prompt) = self.prepare(input).await?;
        let answer = self.deps.llm.complete(&prompt).await?;
        Ok(CypherAnswer { cypher, answer })
    }

    pub async fn invoke(&self, input: &ChainInput) -> Result<String> {
        Ok(self.answer(input).await?.answer)
    }

    pub async fn stream(&self, input: &ChainInput) -> Result<TokenStream> {
        let (_, prompt) = self.prepare(input).await?;
        self.deps.llm.stream(&prompt).await
    }

    async fn run_cypher(&self, cypher: &str) -> Result<String> {
        let rows = self.deps.graph.run_read_query(cypher).await?;
        info!("Cypher returned {} rows", rows.len());

        let rows = Value::Array(rows.into_iter().map(Value::Object).collect());
        let context = to_pretty_json(&remove_keys(rows, &HIDDEN_KEYS))?;
        Ok(context)
    }

    async fn prepare(&self, input: &ChainInput) -> Result<(String, String)> {
        input.validate()?;
        let cypher = self.generate_cypher(&input.input).await?;
        let context = self.run_cypher(&cypher).await?;
        let prompt = RESULTS_TO_LANGUAGE.render(json!({
            "input": input.input,
            "context": context,
        }))?;
        Ok((cypher, prompt))
    }
}

/// Strip markdown fences and a leading `cypher` tag from model output
pub fn strip_code_fences(text: &str) -> String {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix("```") {
        body = rest;
        if body.get(..6).is_some_and(|tag| tag.eq_ignore_ascii_case("cypher")) {
            body = &body[6..];
        }
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }

    body.trim().to_string()
}
