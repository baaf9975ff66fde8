//! MCP (Model Context Protocol) Server Module
//!
//! Exposes the application-model facades as MCP tools.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP client                           │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               │ JSON-RPC over stdio
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         McpServer                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Tools (one route per family operation):                     │
//! │  ├── list_* / get_*          - snapshot reads               │
//! │  ├── add_* / update_*        - validated mutations          │
//! │  ├── replace_*               - full record replacement      │
//! │  ├── add|update|move_<family>_<child> - nested collections  │
//! │  └── open_* / save_model     - host commands                │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Loopback bridge to the host                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod protocol;
pub mod server;
pub mod tools;

pub use handlers::ToolHandlers;
pub use server::McpServer;
pub use tools::{get_tools, ToolRoute};
