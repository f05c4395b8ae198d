//! MCP (Model Context Protocol) Server Module
//!
//! Exposes the simulation session as an MCP server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        MCP client                            │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               │ JSON-RPC over stdio (or POST /mcp)
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      MCP Server (Rust)                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Tools:                                                      │
//! │  ├── run_simulation       - Generate/accept code and run it │
//! │  ├── generate_simulation  - Generate code only              │
//! │  ├── get_templates        - Browse the template corpus      │
//! │  ├── session_status       - Stages, errors, entities        │
//! │  ├── reset_session        - Restart engine, clear state     │
//! │  └── check_environment    - Engine and LLM availability     │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              SimulationSession + Python worker               │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod protocol;
pub mod server;
pub mod tools;

pub use handlers::ToolHandlers;
pub use server::McpServer;
