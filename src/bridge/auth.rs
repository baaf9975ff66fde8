//! Login probe for tools that need the remote model services.

use std::sync::Arc;

use serde_json::Value;

use appmodel_types::Plane;

use super::{Bridge, BridgeRequest};
use crate::config::TimeoutClass;

pub const AUTH_STATUS_PATH: &str = "/api/auth-status";

/// Asks the host whether the user is logged in.
///
/// Any failure of the probe (host down, timeout, unexpected body) counts as
/// "not authenticated"; the gate never reports an error of its own.
#[derive(Clone)]
pub struct AuthGate {
    bridge: Arc<dyn Bridge>,
}

impl AuthGate {
    pub fn new(bridge: Arc<dyn Bridge>) -> Self {
        Self { bridge }
    }

    pub async fn require_auth(&self) -> bool {
        let request = BridgeRequest::get(Plane::Command, AUTH_STATUS_PATH, TimeoutClass::AuthProbe);
        match self.bridge.exchange(request).await {
            Ok(body) => {
                let logged_in = body.get("isLoggedIn").and_then(Value::as_bool) == Some(true);
                tracing::debug!(logged_in, "auth probe answered");
                logged_in
            }
            Err(e) => {
                tracing::debug!(error = %e, "auth probe failed; treating as logged out");
                false
            }
        }
    }
}
