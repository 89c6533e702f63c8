//! HTTP error responses.

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::error::CrmError;

/// A [`CrmError`] rendered as `{"error": message}`.
///
/// Internal detail is logged and never sent to the caller.
#[derive(Debug)]
pub struct ApiError(pub CrmError);

impl From<CrmError> for ApiError {
    fn from(value: CrmError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!("{} (HTTP {}): {}", self.0.category(), status.as_u16(), self.0);
        } else {
            warn!("{} (HTTP {}): {}", self.0.category(), status.as_u16(), self.0);
        }

        (status, Json(json!({ "error": self.0.public_message() }))).into_response()
    }
}

/// Renders a handler panic as an internal error.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError(CrmError::internal(format!("Handler panicked: {detail}"))).into_response()
}
