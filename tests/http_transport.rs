//! HTTP transport: health check and MCP over POST

#![cfg(feature = "server")]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use genesis_mcp::http::create_router;
use genesis_mcp::mcp::{McpServer, ToolHandlers};
use genesis_mcp::{EngineHandle, ServerConfig, SimulationSession};
use genesis_templates::TemplateRegistry;

async fn app() -> Router {
    let config = ServerConfig::dry_run();
    let engine = Arc::new(EngineHandle::new(config.runtime.clone()));
    let templates = Arc::new(TemplateRegistry::builtin().unwrap());
    let session = SimulationSession::open(&engine, &config.session, templates.clone(), None)
        .await
        .unwrap();
    create_router(Arc::new(McpServer::new(ToolHandlers::new(
        session, engine, templates,
    ))))
}

/// Parse response body as JSON.
async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

fn post_mcp(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_tools_list_over_http() {
    let app = app().await;
    let resp = app
        .oneshot(post_mcp(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["result"]["tools"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_notification_is_accepted() {
    let app = app().await;
    let resp = app
        .oneshot(post_mcp(json!({"jsonrpc": "2.0", "method": "notifications/initialized"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_session_shared_between_requests() {
    let app = app().await;
    let run = |id: u64, code: &str| {
        post_mcp(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": {
                "name": "run_simulation",
                "arguments": {"description": "init", "code": code}
            }
        }))
    };

    let first = app
        .clone()
        .oneshot(run(1, "import genesis as gs\ngs.init()"))
        .await
        .unwrap();
    let first = body_json(first).await;
    let payload: Value =
        serde_json::from_str(first["result"]["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(payload["skipped"], json!(false));

    let second = app.clone().oneshot(run(2, "gs.init()")).await.unwrap();
    let second = body_json(second).await;
    let payload: Value =
        serde_json::from_str(second["result"]["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(payload["skipped"], json!(true));
}
