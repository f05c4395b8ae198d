//! HTTP transport for the MCP endpoint
//!
//! ```text
//! GET  /health  -> {"status":"healthy"}
//! POST /mcp     -> one JSON-RPC request in, one response out (202 for notifications)
//! ```

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::mcp::McpServer;

pub fn create_router(server: Arc<McpServer>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/mcp", post(mcp))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

/// POST /mcp
async fn mcp(State(server): State<Arc<McpServer>>, body: String) -> Response {
    match server.handle_message(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

pub async fn serve(server: Arc<McpServer>, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "HTTP transport listening");
    axum::serve(listener, create_router(server)).await?;
    Ok(())
}
