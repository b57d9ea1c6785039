//! Prompt templates
//!
//! Templates are rendered with minijinja in strict mode: a variable the
//! template names but the caller does not supply is an error, not an empty
//! string.

use crate::Result;
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;

/// A named prompt template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub source: &'static str,
}

impl PromptTemplate {
    pub const fn new(name: &'static str, source: &'static str) -> Self {
        Self { name, source }
    }

    /// Render the template against any serializable context
    pub fn render<S: Serialize>(&self, ctx: S) -> Result<String> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_keep_trailing_newline(true);
        env.add_template(self.name, self.source)?;
        let rendered = env.get_template(self.name)?.render(ctx)?;
        Ok(rendered)
    }
}

pub const GRAPH_QA: PromptTemplate = PromptTemplate::new(
    "graph_qa",
    r#"You are a financial expert responsible for answering user questions about companies and asset managers. Answer the question based only on the below Facts and AdditionalContext. Do not assume or retrieve any information outside of Facts and AdditionalContext. The Facts and AdditionalContext are extracted from SEC filings which contain company information as well as asset manager ownership information via stock holdings. The Facts in particular should be respected as absolute fact, never provide answers that contradict the facts. Note that companies are not considered asset managers in this dataset. Where asset manager info is not explicitly available, you can assume the mentioned asset managers are impacted by the same things as the companies they own.

# Facts
{{ facts }}

# AdditionalContext
{{ additionalContext }}

# Question:
{{ question }}

# Answer:
"#,
);

pub const CHAT_QA: PromptTemplate = PromptTemplate::new(
    "chat_qa",
    r#"You are a financial expert holding a conversation with a user about companies and asset managers. Answer the latest question based only on the below Facts, AdditionalContext and ChatHistory. Do not assume or retrieve any information outside of them. The Facts and AdditionalContext are extracted from SEC filings which contain company information as well as asset manager ownership information via stock holdings. The Facts in particular should be respected as absolute fact, never provide answers that contradict the facts. Note that companies are not considered asset managers in this dataset.

# ChatHistory
{{ chat_history }}

# Facts
{{ facts }}

# AdditionalContext
{{ additionalContext }}

# Question:
{{ question }}

# Answer:
"#,
);

pub const VECTOR_QA: PromptTemplate = PromptTemplate::new(
    "vector_qa",
    r#"You are a financial expert responsible for answering user questions about companies and asset managers. Answer the question based only on the below Context. Do not assume or retrieve any information outside of the Context. The Context is extracted from SEC filings which contain company information as well as asset manager ownership information via stock holdings.
{% if chat_history %}
# ChatHistory
{{ chat_history }}
{% endif %}
# Context
{{ context }}

# Question:
{{ question }}

# Answer:
"#,
);

pub const CONDENSE_QUESTION: PromptTemplate = PromptTemplate::new(
    "condense_question",
    r#"Given the following conversation and a follow up question, rephrase the follow up question to be a standalone question, in its original language.

Chat History:
{{ chat_history }}
Follow Up Input: {{ question }}
Standalone question:"#,
);

pub const TEXT2CYPHER: PromptTemplate = PromptTemplate::new(
    "text2cypher",
    r#"#Context

You have expertise in neo4j cypher query language and based on below graph data model schema,
you are going to help me write cypher queries.

Node Labels and Properties

["Company"], ["cik:String", "cusip:String", "companyName:String"]
["Manager"], ["managerName:String"]
["Document"], ["text:String"]

Accepted graph traversal paths

(:Manager)-[:OWNS]->(:Company),
(:Company)-[:HAS_DOCUMENT]->(:Document),

Remove english explanation and any markdown annotation, provide just the Cypher code.
# Ask:
{{ input }}
"#,
);

pub const RESULTS_TO_LANGUAGE: PromptTemplate = PromptTemplate::new(
    "results_to_language",
    r#"Transform below data to human readable format with bullets if needed, And summarize it in a sentence or two if possible
# Sample Ask and Response :
## Ask:
Get distinct watch terms ?

## Response:
["alert","attorney","bad","canceled","charge"]

## Output:
Here are the distinct watch terms
- "alert"
- "attorney"
- "bad"
- "canceled"
- "charge"

# Generate similar output for below Ask and Response

## Ask
{{ input }}

## Response:
{{ context }}

## Output:
"#,
);

/// Every built-in template, for listing and sanity checks
pub const ALL: [PromptTemplate; 6] = [
    GRAPH_QA,
    CHAT_QA,
    VECTOR_QA,
    CONDENSE_QUESTION,
    TEXT2CYPHER,
    RESULTS_TO_LANGUAGE,
];
