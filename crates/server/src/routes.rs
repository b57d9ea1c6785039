//! Chain endpoints
//!
//! Each chain is mounted under its path `P` with three operations:
//! `P/invoke`, `P/batch` and `P/stream` (trailing slashes accepted).

use crate::error::{ApiError, Result};
use crate::AppState;
use async_stream::stream;
use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        Redirect, Sse,
    },
    routing::post,
    Router,
};
use futures::{Stream, StreamExt};
use sec_graphrag_agents::Chain;
use sec_graphrag_core::ChainRequest;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Deserialize, Debug)]
pub struct InvokeRequest {
    pub input: ChainRequest,
}

#[derive(Deserialize, Debug)]
pub struct BatchRequest {
    pub inputs: Vec<ChainRequest>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RunMetadata {
    pub run_id: Uuid,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct InvokeResponse {
    pub output: Value,
    pub metadata: RunMetadata,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct BatchMetadata {
    pub run_ids: Vec<Uuid>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct BatchResponse {
    pub output: Vec<Value>,
    pub metadata: BatchMetadata,
}

/// invoke/batch/stream for one chain
pub fn chain_router(chain: Arc<dyn Chain>) -> Router<AppState> {
    Router::new()
        .route("/invoke", post(invoke))
        .route("/invoke/", post(invoke))
        .route("/batch", post(batch))
        .route("/batch/", post(batch))
        .route("/stream", post(stream_chain))
        .route("/stream/", post(stream_chain))
        .with_state(chain)
}

pub async fn invoke(
    State(chain): State<Arc<dyn Chain>>,
    payload: std::result::Result<Json<InvokeRequest>, JsonRejection>,
) -> Result<Json<InvokeResponse>> {
    let Json(request) = payload?;
    let input = request.input.into_input()?;
    let run_id = Uuid::new_v4();
    info!("{} invoke {}: {}", chain.name(), run_id, input.input);

    let output = chain.invoke(input).await?;
    Ok(Json(InvokeResponse {
        output,
        metadata: RunMetadata { run_id },
    }))
}

pub async fn batch(
    State(chain): State<Arc<dyn Chain>>,
    payload: std::result::Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>> {
    let Json(request) = payload?;
    let inputs = request
        .inputs
        .into_iter()
        .map(ChainRequest::into_input)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    info!("{} batch of {}", chain.name(), inputs.len());

    let mut output = Vec::with_capacity(inputs.len());
    let mut run_ids = Vec::with_capacity(inputs.len());
    for input in inputs {
        run_ids.push(Uuid::new_v4());
        output.push(chain.invoke(input).await?);
    }

    Ok(Json(BatchResponse {
        output,
        metadata: BatchMetadata { run_ids },
    }))
}

/// Server-sent events: `metadata`, then one `data` per chunk, then `end`.
/// A failure after the response has started becomes an `error` event.
pub async fn stream_chain(
    State(chain): State<Arc<dyn Chain>>,
    payload: std::result::Result<Json<InvokeRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let Json(request) = payload?;
    let input = request.input.into_input()?;
    let run_id = Uuid::new_v4();
    info!("{} stream {}: {}", chain.name(), run_id, input.input);

    let events = stream! {
        yield Ok(Event::default().event("metadata").data(json!({ "run_id": run_id }).to_string()));

        let failure = match chain.stream(input).await {
            Ok(mut chunks) => {
                let mut failure = None;
                while let Some(chunk) = chunks.next().await {
                    match chunk {
                        Ok(value) => {
                            yield Ok(Event::default().event("data").data(value.to_string()));
                        }
                        Err(err) => {
                            failure = Some(err);
                            break;
                        }
                    }
                }
                failure
            }
            Err(err) => Some(err),
        };

        match failure {
            Some(err) => {
                let err = ApiError::from(err);
                warn!("{} stream {} failed: {}", chain.name(), run_id, err);
                yield Ok(error_event(err.status(), &err.message()));
            }
            None => {
                yield Ok(Event::default().event("end"));
            }
        }
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn error_event(status: StatusCode, message: &str) -> Event {
    let body = json!({ "status_code": status.as_u16(), "message": message });
    Event::default().event("error").data(body.to_string())
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "chains": state.registry.paths(),
    }))
}

pub async fn root() -> Redirect {
    Redirect::temporary("/dashboard")
}
