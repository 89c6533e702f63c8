//! HTTP surface over [`QueryService`].

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::error::{CrmError, Result};
use crate::service::QueryService;

pub use error::ApiError;
pub use handlers::{ProcessQueryRequest, QueryRequest, SERVICE_NAME};

/// Builds the application router.
pub fn router(service: Arc<QueryService>) -> Router {
    Router::new()
        .route("/process-query", post(handlers::process_query))
        .route("/api/query", post(handlers::api_query))
        .route("/download-excel/{filename}", get(handlers::download_excel))
        .route("/api/campaigns", get(handlers::campaigns))
        .route("/health", get(handlers::health))
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Serves the router on `bind` until the process is stopped.
pub async fn serve(service: QueryService, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| CrmError::config(format!("Failed to bind {bind}: {e}")))?;
    info!("Listening on {}", bind);

    axum::serve(listener, router(Arc::new(service)))
        .await
        .map_err(|e| CrmError::internal(format!("Server error: {e}")))
}
