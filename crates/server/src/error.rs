//! HTTP error mapping

use axum::{
    extract::{rejection::JsonRejection, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sec_graphrag_agents::AgentError;
use sec_graphrag_core::CoreError;
use serde::Serialize;
use thiserror::Error;

pub trait ErrorToResponse: Serialize {
    fn to_response(&self, code: StatusCode) -> Response {
        let mut r = Json(self).into_response();
        *r.status_mut() = code;
        r
    }
}

/// Body of every error response
#[derive(Serialize, Debug)]
pub struct JsonError {
    message: String,
}

impl JsonError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl ErrorToResponse for JsonError {}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Rejection(#[from] JsonRejection),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("No chain registered at {0}")]
    MissingChain(String),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Rejection(rejection) => match rejection {
                // Request didn't have `Content-Type: application/json`
                JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                // Couldn't deserialize the body into the target type
                JsonRejection::JsonDataError(_) => StatusCode::UNPROCESSABLE_ENTITY,
                // Syntax error in the body
                JsonRejection::JsonSyntaxError(_) => StatusCode::BAD_REQUEST,
                other => other.status(),
            },
            ApiError::Agent(err) if err.is_invalid_input() => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Core(CoreError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::Rejection(JsonRejection::MissingJsonContentType(_)) => {
                "Missing `Content-Type: application/json` header".to_string()
            }
            ApiError::Rejection(rejection) => rejection.body_text(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }
        JsonError::new(self.message()).to_response(status)
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
