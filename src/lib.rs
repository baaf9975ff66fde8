//! appmodel-bridge
//!
//! Tool-side mutation engine for an application model held in memory by a
//! separate host process. Every read and write crosses a loopback HTTP bridge.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 MCP tool runner (stdio JSON-RPC)              │
//! │  mcp::server -> mcp::handlers -> facade::{owned, data_object, │
//! │                 user_story, commands}                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  engine: EntityLocator · PropertyProjector · UpdateValidator │
//! │          reorder                 catalog: per-family YAML    │
//! ├──────────────────────────────────────────────────────────────┤
//! │  bridge: HttpBridge (data-plane / command-plane) · AuthGate  │
//! └──────────────────────────────────────────────────────────────┘
//!                               │ loopback HTTP
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │        host process (owns the document; `host` feature)      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod bridge;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod facade;
#[cfg(feature = "host")]
pub mod host;
pub mod mcp;

pub use appmodel_types as types;
pub use bridge::{AuthGate, Bridge, BridgeRequest, HttpBridge, Method};
pub use config::{BridgeConfig, TimeoutClass, TimeoutConfig};
pub use error::{BridgeError, ToolError};
pub use facade::Toolbox;
