//! REST handlers and the mapping from crate errors to HTTP responses.

pub mod analysis;
pub mod comments;
pub mod users;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::Error;

/// Handler error: client mistakes become 400, missing rows 404, anything
/// else a generic 500 with the detail kept in the log.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Error::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            err if err.is_client_error() => {
                tracing::warn!("Validation error: {err}");
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            Error::NotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            err => {
                tracing::error!("Request failed: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
