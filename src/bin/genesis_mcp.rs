//! Genesis MCP Server Binary
//!
//! Runs the simulation session as an MCP server.
//!
//! ## Usage
//!
//! ```bash
//! # stdio transport (what MCP clients launch)
//! ./target/debug/genesis_mcp
//!
//! # offline, no Python needed
//! ./target/debug/genesis_mcp --dry-run
//!
//! # HTTP transport
//! cargo run --bin genesis_mcp --features server -- --http 127.0.0.1:8765
//! ```
//!
//! ## Environment Variables
//!
//! - `GENESIS_PYTHON`, `GENESIS_MODULE`, `GENESIS_ALIAS`: engine worker
//! - `GENESIS_GATE_POLICY`: `skip` (default) or `rewrite`
//! - `AGENT_BACKEND` plus the matching `*_API_KEY`: LLM backend (optional)

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use genesis_mcp::mcp::{McpServer, ToolHandlers};
use genesis_mcp::{EngineHandle, GatePolicy, ServerConfig, SimulationSession};
use genesis_templates::TemplateRegistry;

#[derive(Parser)]
#[command(name = "genesis_mcp")]
#[command(version)]
#[command(about = "MCP server generating and running Genesis simulation code")]
struct Args {
    /// Serve MCP over HTTP on this address instead of stdio
    #[arg(long, value_name = "ADDR")]
    http: Option<String>,

    /// Use the scripted offline engine instead of Python
    #[arg(long)]
    dry_run: bool,

    /// Gate policy for fragments repeating completed stages
    #[arg(long, value_name = "skip|rewrite")]
    gate_policy: Option<GatePolicy>,

    /// Python interpreter command
    #[arg(long, env = "GENESIS_PYTHON")]
    python: Option<String>,

    /// Log filter directive (overrides RUST_LOG)
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // stdout belongs to JSON-RPC frames
    let filter = match &args.log_level {
        Some(directive) => EnvFilter::try_new(directive)?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("genesis_mcp=info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let mut config = ServerConfig::from_env()?;
    if args.dry_run {
        config.runtime.dry_run = true;
    }
    if let Some(policy) = args.gate_policy {
        config.session.gate_policy = policy;
    }
    if let Some(python) = args.python {
        config.runtime.python = python;
    }

    let templates = Arc::new(TemplateRegistry::builtin()?);
    tracing::info!(templates = templates.len(), "template corpus loaded");

    let llm = match genesis_agentic::create_llm_client() {
        Ok(client) => {
            tracing::info!(
                provider = client.provider_name(),
                model = client.model_name(),
                "LLM backend ready"
            );
            Some(client)
        }
        Err(e) => {
            tracing::warn!(error = %e, "no LLM backend; fallback code will be used");
            None
        }
    };

    let engine = Arc::new(EngineHandle::new(config.runtime.clone()));
    let probe = engine.probe().await;
    if probe.available {
        tracing::info!(runtime = probe.runtime, "{}", probe.detail);
    } else {
        tracing::warn!(runtime = probe.runtime, "{}", probe.detail);
    }

    let session =
        SimulationSession::open(&engine, &config.session, templates.clone(), llm).await?;
    let server = McpServer::new(ToolHandlers::new(session, engine, templates));

    match args.http {
        #[cfg(feature = "server")]
        Some(addr) => genesis_mcp::http::serve(Arc::new(server), &addr).await,
        #[cfg(not(feature = "server"))]
        Some(_) => anyhow::bail!("--http requires building with the `server` feature"),
        None => server.run().await,
    }
}
