//! Loopback bridge to the host process.
//!
//! One `exchange` is one request/response pair on either the data plane or the
//! command plane. There is no retry, no connection reuse guarantee and no
//! cancellation other than the exchange's timeout.

pub mod auth;
pub mod client;

use async_trait::async_trait;
use serde_json::Value;

use appmodel_types::Plane;

use crate::config::TimeoutClass;
use crate::error::BridgeError;

pub use auth::AuthGate;
pub use client::HttpBridge;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// A single bridge request.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeRequest {
    pub plane: Plane,
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: TimeoutClass,
}

impl BridgeRequest {
    pub fn get(plane: Plane, path: impl Into<String>, timeout: TimeoutClass) -> Self {
        Self {
            plane,
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
            timeout,
        }
    }

    pub fn post(plane: Plane, path: impl Into<String>, body: Value, timeout: TimeoutClass) -> Self {
        Self {
            plane,
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            timeout,
        }
    }

    /// Add a query filter; `None` values are skipped.
    pub fn with_query(mut self, key: &str, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.query.push((key.to_string(), value.to_string()));
        }
        self
    }
}

/// Transport seam between the facades and the host.
#[async_trait]
pub trait Bridge: Send + Sync {
    /// Perform one exchange and return the parsed response body.
    ///
    /// A body carrying `success: false` is reported as
    /// [`BridgeError::HostReportedFailure`].
    async fn exchange(&self, request: BridgeRequest) -> Result<Value, BridgeError>;
}
