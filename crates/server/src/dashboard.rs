//! Side-by-side comparison page: vector-only RAG next to GraphRAG

use crate::error::{ApiError, Result};
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::Html,
};
use minijinja::{context, Environment};
use sec_graphrag_agents::ChainRegistry;
use sec_graphrag_core::{ChainInput, CoreError, DashboardContext, RetrievalMode, RetrievedContext};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const TEMPLATE_NAME: &str = "dashboard.html";
const TEMPLATE: &str = include_str!("../templates/dashboard.html");

pub const SAMPLE_QUESTIONS: [&str; 6] = [
    "Which companies and asset managers are most affected during covid?",
    "Which companies and asset managers are vulnerable to chip shortage?",
    "Which asset managers have investments in outside USA? Explain with evidence",
    "Which asset managers are exposed to defense industries based on the companies they own shares in?",
    "Which company sells analytics solutions?",
    "If I have to invest in commodities, what are the list of asset managers to look into?",
];

/// Template environment with the dashboard loaded
pub fn templates() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_template(TEMPLATE_NAME, TEMPLATE)?;
    Ok(env)
}

#[derive(Deserialize, Debug, Default)]
pub struct DashboardQuery {
    #[serde(default)]
    pub q: Option<String>,
}

/// One column of the page
#[derive(Serialize, Debug)]
struct Column {
    id: &'static str,
    label: &'static str,
    stream_route: String,
    context: Option<String>,
    error: Option<String>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Html<String>> {
    let question = query
        .q
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty());

    let (baseline, graph) = futures::join!(
        column(&state.registry, RetrievalMode::VectorOnly, question.as_deref()),
        column(&state.registry, RetrievalMode::Graph, question.as_deref()),
    );

    let page = state.templates.get_template(TEMPLATE_NAME)?.render(context! {
        question => question,
        columns => vec![baseline, graph],
        sample_rows => SAMPLE_QUESTIONS.chunks(3).collect::<Vec<_>>(),
    })?;
    Ok(Html(page))
}

async fn column(registry: &ChainRegistry, mode: RetrievalMode, question: Option<&str>) -> Column {
    let (id, stream_route) = match mode {
        RetrievalMode::VectorOnly => ("baseline", "/completion-vector-only/stream".to_string()),
        RetrievalMode::Graph => ("graph", "/completion/stream".to_string()),
    };
    let mut column = Column {
        id,
        label: mode.label(),
        stream_route,
        context: None,
        error: None,
    };

    if let Some(question) = question {
        match load_context(registry, mode, question).await {
            Ok(context) => column.context = Some(context),
            Err(err) => {
                warn!("Dashboard {} context failed: {}", mode, err);
                column.error = Some(err.message());
            }
        }
    }
    column
}

/// Retrieved context for `question`, reshaped and pretty-printed
pub async fn load_context(registry: &ChainRegistry, mode: RetrievalMode, question: &str) -> Result<String> {
    let path = format!("/completion-context{}", mode.route_suffix());
    let chain = registry
        .get(&path)
        .ok_or_else(|| ApiError::MissingChain(path.clone()))?;

    info!("Dashboard context via {}", path);
    let value = chain.invoke(ChainInput::question(question)).await?;
    let context: RetrievedContext = serde_json::from_value(value).map_err(CoreError::from)?;
    Ok(DashboardContext::from_context(&context).to_pretty()?)
}
