//! JSON-RPC handling of the MCP server, driven in-process

use std::sync::Arc;

use serde_json::{json, Value};

use genesis_mcp::mcp::protocol::ErrorCode;
use genesis_mcp::mcp::{McpServer, ToolHandlers};
use genesis_mcp::{EngineHandle, ServerConfig, SimulationSession};
use genesis_templates::TemplateRegistry;

async fn server() -> McpServer {
    let config = ServerConfig::dry_run();
    let engine = Arc::new(EngineHandle::new(config.runtime.clone()));
    let templates = Arc::new(TemplateRegistry::builtin().unwrap());
    let session = SimulationSession::open(&engine, &config.session, templates.clone(), None)
        .await
        .unwrap();
    McpServer::new(ToolHandlers::new(session, engine, templates))
}

async fn call(server: &McpServer, request: Value) -> Value {
    let response = server
        .handle_message(&request.to_string())
        .await
        .expect("request should get a response");
    serde_json::to_value(response).unwrap()
}

/// Parse the text payload of a tools/call result
fn tool_payload(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

async fn run_simulation(server: &McpServer, id: u64, args: Value) -> Value {
    let response = call(
        server,
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": {"name": "run_simulation", "arguments": args}
        }),
    )
    .await;
    tool_payload(&response)
}

#[tokio::test]
async fn test_initialize() {
    let server = server().await;
    let response = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
    )
    .await;

    assert_eq!(response["id"], json!(1));
    assert_eq!(response["result"]["protocolVersion"], json!("2024-11-05"));
    assert_eq!(response["result"]["serverInfo"]["name"], json!("genesis-mcp"));
    assert_eq!(
        response["result"]["capabilities"]["tools"]["listChanged"],
        json!(false)
    );
    assert!(response.get("error").is_none());
}

#[tokio::test]
async fn test_notifications_get_no_response() {
    let server = server().await;
    let response = server
        .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await;
    assert!(response.is_none());
}

#[tokio::test]
async fn test_ping() {
    let server = server().await;
    let response = call(&server, json!({"jsonrpc": "2.0", "id": "p", "method": "ping"})).await;
    assert_eq!(response["id"], json!("p"));
    assert_eq!(response["result"], json!({}));
}

#[tokio::test]
async fn test_tools_list() {
    let server = server().await;
    let response = call(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;
    let names: Vec<&str> = response["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "run_simulation",
            "generate_simulation",
            "get_templates",
            "session_status",
            "reset_session",
            "check_environment"
        ]
    );
    assert_eq!(
        response["result"]["tools"][0]["inputSchema"]["required"],
        json!(["description"])
    );
}

#[tokio::test]
async fn test_error_codes() {
    let server = server().await;

    let parse = serde_json::to_value(server.handle_message("{not json").await.unwrap()).unwrap();
    assert_eq!(parse["error"]["code"], json!(ErrorCode::ParseError.code()));

    let unknown = call(&server, json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"})).await;
    assert_eq!(unknown["error"]["code"], json!(ErrorCode::MethodNotFound.code()));

    let bad_params = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": {"arguments": {}}}),
    )
    .await;
    assert_eq!(bad_params["error"]["code"], json!(ErrorCode::InvalidParams.code()));
}

#[tokio::test]
async fn test_session_continues_across_calls() {
    let server = server().await;

    let first = run_simulation(
        &server,
        10,
        json!({"description": "setup", "code": "import genesis as gs\ngs.init()\nscene = gs.Scene()"}),
    )
    .await;
    assert_eq!(first["success"], json!(true));
    assert_eq!(first["result"], json!("Simulation code executed"));
    assert_eq!(first["completed_stages"], json!(["initialized", "scene_created"]));

    let again = run_simulation(
        &server,
        11,
        json!({"description": "init again", "code": "gs.init()"}),
    )
    .await;
    assert_eq!(again["success"], json!(true));
    assert_eq!(again["skipped"], json!(true));

    let failed = run_simulation(
        &server,
        12,
        json!({"description": "boom", "code": "raise ValueError(\"boom\")"}),
    )
    .await;
    assert_eq!(failed["success"], json!(false));
    assert_eq!(failed["error"], json!("boom"));
    assert!(failed.get("result").is_none());

    let status = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 13, "method": "tools/call",
               "params": {"name": "session_status", "arguments": {}}}),
    )
    .await;
    let status = tool_payload(&status);
    assert_eq!(status["error_count"], json!(1));
    assert_eq!(status["turns"], json!(2));
    assert_eq!(status["next_stage"], json!("entities_added"));
}

#[tokio::test]
async fn test_reset_session_tool() {
    let server = server().await;
    run_simulation(
        &server,
        20,
        json!({"description": "init", "code": "import genesis as gs\ngs.init()"}),
    )
    .await;

    let reset = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 21, "method": "tools/call",
               "params": {"name": "reset_session"}}),
    )
    .await;
    assert_eq!(tool_payload(&reset)["success"], json!(true));

    let rerun = run_simulation(
        &server,
        22,
        json!({"description": "init", "code": "import genesis as gs\ngs.init()"}),
    )
    .await;
    assert_eq!(rerun["skipped"], json!(false));
    assert_eq!(rerun["success"], json!(true));
}

#[tokio::test]
async fn test_templates_and_environment() {
    let server = server().await;

    let templates = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 30, "method": "tools/call",
               "params": {"name": "get_templates", "arguments": {"category": "robots"}}}),
    )
    .await;
    let templates = tool_payload(&templates);
    assert_eq!(templates["category"], json!("robots"));
    assert!(!templates["templates"].as_array().unwrap().is_empty());

    let env = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 31, "method": "tools/call",
               "params": {"name": "check_environment", "arguments": {}}}),
    )
    .await;
    let env = tool_payload(&env);
    assert_eq!(env["engine"]["available"], json!(true));
    assert_eq!(env["engine"]["runtime"], json!("scripted"));
    assert_eq!(env["llm_available"], json!(false));
}
