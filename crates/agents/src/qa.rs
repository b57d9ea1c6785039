//! Question answering over retrieved SEC context
//!
//! Every QA chain runs the same pipeline:
//! question -> (condense) -> embed -> vector search -> (fact expansion)
//! -> prompt -> model. The variants differ in whether history is folded
//! into the question, whether it is shown to the model, and whether the
//! graph is consulted at all.

use crate::chain::ChainDeps;
use crate::condense::CondenseQuestion;
use crate::{Result, TokenStream};
use sec_graphrag_core::prompt::{CHAT_QA, GRAPH_QA, VECTOR_QA};
use sec_graphrag_core::{
    format_chat_history, format_docs, ChainInput, PromptTemplate, RetrievalMode, RetrievedContext,
};
use tracing::{info, instrument};

/// How a QA chain treats the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QaStyle {
    /// Condense history into the search question; answer the question alone
    Assistant,
    /// Condense history, and show it to the model when answering
    Chat,
    /// Single-turn: no condensation, no history
    Completion,
}

impl QaStyle {
    pub const ALL: [QaStyle; 3] = [QaStyle::Assistant, QaStyle::Chat, QaStyle::Completion];

    /// Route path of the graph variant
    pub fn route(&self) -> &'static str {
        match self {
            QaStyle::Assistant => "/assistant",
            QaStyle::Chat => "/chat",
            QaStyle::Completion => "/completion",
        }
    }

    fn condenses(&self) -> bool {
        !matches!(self, QaStyle::Completion)
    }
}

#[derive(Clone)]
pub struct QaChain {
    deps: ChainDeps,
    condense: CondenseQuestion,
    mode: RetrievalMode,
    style: QaStyle,
}

impl QaChain {
    pub fn new(deps: ChainDeps, mode: RetrievalMode, style: QaStyle) -> Self {
        let condense = CondenseQuestion::new(deps.llm.clone());
        Self {
            deps,
            condense,
            mode,
            style,
        }
    }

    pub fn mode(&self) -> RetrievalMode {
        self.mode
    }

    pub fn style(&self) -> QaStyle {
        self.style
    }

    /// Gather the context the model will answer from
    #[instrument(skip(self, input), fields(mode = %self.mode, style = ?self.style))]
    pub async fn retrieve(&self, input: &ChainInput) -> Result<RetrievedContext> {
        input.validate()?;
        info!("Retrieving context for: {}", input.input);

        let search_question = if self.style.condenses() {
            self.condense.standalone(input).await?
        } else {
            input.input.clone()
        };

        let retrieval = &self.deps.retrieval;
        let embedding = self.deps.embedder.embed(&search_question).await?;
        let chunks = self
            .deps
            .graph
            .vector_search(&retrieval.index_name, retrieval.top_k, embedding)
            .await?;
        let documents = format_docs(&chunks)?;

        let context = match self.mode {
            RetrievalMode::Graph => {
                let facts = self.deps.graph.retrieve_facts(&chunks).await?;
                info!("Retrieved {} chunks and {} facts", chunks.len(), facts.len());
                RetrievedContext::Graph {
                    facts: facts.join("\n"),
                    additional_context: documents,
                    question: input.input.clone(),
                }
            }
            RetrievalMode::VectorOnly => {
                info!("Retrieved {} chunks", chunks.len());
                RetrievedContext::Vector {
                    context: documents,
                    question: input.input.clone(),
                }
            }
        };

        Ok(context)
    }

    /// Render the answer prompt for a retrieved context
    pub fn render_prompt(&self, input: &ChainInput, context: &RetrievedContext) -> Result<String> {
        let chat_history = match self.style {
            QaStyle::Chat => format_chat_history(&input.chat_history),
            _ => String::new(),
        };
        let prompt = self.template(context).render(context.prompt_variables(&chat_history))?;
        Ok(prompt)
    }

    pub async fn invoke(&self, input: &ChainInput) -> Result<String> {
        let prompt = self.prepare(input).await?;
        self.deps.llm.complete(&prompt).await
    }

    pub async fn stream(&self, input: &ChainInput) -> Result<TokenStream> {
        let prompt = self.prepare(input).await?;
        self.deps.llm.stream(&prompt).await
    }

    async fn prepare(&self, input: &ChainInput) -> Result<String> {
        let context = self.retrieve(input).await?;
        self.render_prompt(input, &context)
    }

    fn template(&self, context: &RetrievedContext) -> PromptTemplate {
        match (context.mode(), self.style) {
            (RetrievalMode::Graph, QaStyle::Chat) => CHAT_QA,
            (RetrievalMode::Graph, _) => GRAPH_QA,
            (RetrievalMode::VectorOnly, _) => VECTOR_QA,
        }
    }
}
