//! Relay error type and its HTTP rendering.

use crate::channels::ChannelError;
use crate::llm::LlmError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Why an inbound event could not be relayed.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Body is not JSON or lacks `message.chat.id`.
    #[error("malformed update: {0}")]
    Malformed(String),

    /// Provider unreachable, non-2xx, or returned no usable choice.
    #[error(transparent)]
    Completion(#[from] LlmError),

    /// Reply was generated but could not be sent; it is dropped.
    #[error(transparent)]
    Delivery(#[from] ChannelError),

    /// The spawned relay task panicked or was cancelled.
    #[error("relay task failed: {0}")]
    Task(String),
}

/// Every failure is reported as 500 with `{"error": message}`.
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
