use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde_json::json;
use thiserror::Error;

use super::AppState;
use crate::error::{ErrorKind, StoreError, SurveyResultError, ValidationError};

/// Details of a 5xx failure, attached to the response for
/// [`log_server_errors`] to persist.
#[derive(Debug, Clone)]
pub struct ServerError(pub String);

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("access denied")]
    AccessDenied,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    SurveyResult(#[from] SurveyResultError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AccessDenied => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::SurveyResult(err) => match err.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::StoreFailure | ErrorKind::AggregationInvariantViolation => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let mut detail = None;
        let message = if status.is_server_error() {
            error!("Request failed: {}", self);
            detail = Some(ServerError(format!("{:?}", self)));
            "internal server error".to_string()
        } else {
            match &self {
                ApiError::SurveyResult(SurveyResultError::SurveyNotFound { .. }) => {
                    "invalid param: survey_id".to_string()
                }
                ApiError::SurveyResult(SurveyResultError::AnswerNotFound { .. }) => {
                    "invalid param: answer".to_string()
                }
                other => other.to_string(),
            }
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();
        if let Some(detail) = detail {
            response.extensions_mut().insert(detail);
        }
        response
    }
}

/// Stores the details of every server error response in the errors table.
pub async fn log_server_errors(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let stack = response
        .extensions()
        .get::<ServerError>()
        .map(|ServerError(stack)| stack.clone());

    if let Some(stack) = stack {
        if let Err(e) = state.database.log_error(&stack).await {
            error!("Failed to record server error: {}", e);
        }
    }

    response
}
