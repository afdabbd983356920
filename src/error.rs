//! Request-level error taxonomy for the `codemetal-wattflow` backend.
//!
//! Every fallible handler returns [`ApiError`], which maps onto an HTTP
//! status and a JSON `{"error": "..."}` body:
//! - `Validation` → 400 (semantic checks done inside handlers; malformed
//!   bodies/params are already rejected by the axum extractors)
//! - `NotFound`   → 404 (e.g. summary for an unknown device)
//! - `Storage`    → 500 (database failure; logged, detail not leaked)
//!
//! Broadcast delivery failures are deliberately NOT part of this taxonomy:
//! they stay inside the hub and only cost the dead subscriber its slot.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

// ---

#[derive(Debug, Error)]
pub enum ApiError {
    // ---
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

impl ApiError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        // ---
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        let status = self.status();
        let message = match &self {
            ApiError::Validation(msg) | ApiError::NotFound(msg) => msg.clone(),
            ApiError::Storage(e) => {
                tracing::error!("storage failure: {}", e);
                // Driver detail stays in the logs, not the response body
                "storage failure".to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
