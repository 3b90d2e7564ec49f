//! HTTP-facing errors for the gate service.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use course_gate_client::CourseApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Api(#[from] CourseApiError),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Api(CourseApiError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServerError::Api(_) => StatusCode::BAD_GATEWAY,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
