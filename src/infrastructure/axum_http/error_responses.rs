use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

/// Renders a use-case error as the shared error body. Internal errors and
/// signature failures are masked so no detail leaks to the caller.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let message = match status {
        // Don't leak internal error detail to the client.
        StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
        // Don't reveal which authenticity check failed.
        StatusCode::UNAUTHORIZED => "Unauthorized".to_string(),
        _ => message.into(),
    };

    let body = Json(ErrorResponse {
        code: status.as_u16(),
        message,
    });

    (status, body).into_response()
}
