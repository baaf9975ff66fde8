//! Error taxonomy for the bridge and the tool surface.
//!
//! `BridgeError` classifies a single exchange. `ToolError` is what a tool call
//! reports back to its caller; every variant renders as a structured
//! `{success: false, error, error_code}` value rather than a tool-call failure.

use serde_json::{json, Value};
use thiserror::Error;

use appmodel_types::{error_codes, Plane};

use crate::engine::locator::LocateError;
use crate::engine::reorder::ReorderError;
use crate::engine::validator::Violation;

/// Failure of one bridge exchange.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Nothing accepted the connection (host not running) or it dropped mid-exchange.
    #[error("cannot reach the host {plane} at {url}: {reason}")]
    ConnectionRefused {
        plane: Plane,
        url: String,
        reason: String,
    },

    #[error("{plane} request to {url} timed out after {timeout_ms}ms")]
    Timeout {
        plane: Plane,
        url: String,
        timeout_ms: u64,
    },

    /// The body was not the structured document the protocol promises.
    #[error("malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    /// The host answered `success: false`.
    #[error("{message}")]
    HostReportedFailure {
        message: String,
        code: Option<String>,
    },
}

impl BridgeError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConnectionRefused { .. } => "CONNECTION_REFUSED",
            Self::Timeout { .. } => "TIMEOUT",
            Self::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            Self::HostReportedFailure { .. } => "HOST_REPORTED_FAILURE",
        }
    }
}

/// Expected failure of a tool operation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Bridge unavailable: {0}. Is the host application running?")]
    BridgeUnavailable(String),

    #[error("Malformed response from host: {0}")]
    MalformedResponse(String),

    #[error("Validation failed: {}", format_violations(.0))]
    ValidationFailed(Vec<Violation>),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    DuplicateName(String),

    #[error("Authentication required. Please log in to the model services before using this tool.")]
    AuthRequired,

    #[error("{0}")]
    InvalidPosition(String),

    #[error("Host rejected the request: {0}")]
    HostRejected(String),
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ToolError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BridgeUnavailable(_) => "BRIDGE_UNAVAILABLE",
            Self::MalformedResponse(_) => "MALFORMED_RESPONSE",
            Self::ValidationFailed(_) => "VALIDATION_FAILED",
            Self::NotFound(_) => error_codes::NOT_FOUND,
            Self::DuplicateName(_) => error_codes::DUPLICATE_NAME,
            Self::AuthRequired => "AUTH_REQUIRED",
            Self::InvalidPosition(_) => error_codes::INVALID_POSITION,
            Self::HostRejected(_) => "HOST_REJECTED",
        }
    }

    /// Structured failure value returned to the tool caller.
    pub fn to_failure(&self) -> Value {
        let mut failure = json!({
            "success": false,
            "error": self.to_string(),
            "error_code": self.code(),
        });
        if let Self::ValidationFailed(violations) = self {
            failure["violations"] = violations.iter().map(|v| json!(v.to_string())).collect();
        }
        failure
    }
}

impl From<BridgeError> for ToolError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::ConnectionRefused { .. } | BridgeError::Timeout { .. } => {
                ToolError::BridgeUnavailable(err.to_string())
            }
            BridgeError::MalformedResponse { .. } => ToolError::MalformedResponse(err.to_string()),
            BridgeError::HostReportedFailure { message, code } => match code.as_deref() {
                Some(error_codes::NOT_FOUND) => ToolError::NotFound(message),
                Some(error_codes::DUPLICATE_NAME) => ToolError::DuplicateName(message),
                Some(error_codes::INVALID_POSITION) => ToolError::InvalidPosition(message),
                _ => ToolError::HostRejected(message),
            },
        }
    }
}

impl From<LocateError> for ToolError {
    fn from(err: LocateError) -> Self {
        match err {
            LocateError::NotFound { .. } => ToolError::NotFound(err.to_string()),
            LocateError::Duplicate { .. } => ToolError::DuplicateName(err.to_string()),
        }
    }
}

impl From<ReorderError> for ToolError {
    fn from(err: ReorderError) -> Self {
        match err {
            ReorderError::OutOfRange { .. } => ToolError::InvalidPosition(err.to_string()),
            ReorderError::NotFound { .. } => ToolError::NotFound(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_and_refused_are_unavailable() {
        let timeout = BridgeError::Timeout {
            plane: Plane::Data,
            url: "http://127.0.0.1:3001/api/reports".into(),
            timeout_ms: 30_000,
        };
        assert!(matches!(
            ToolError::from(timeout),
            ToolError::BridgeUnavailable(_)
        ));

        let refused = BridgeError::ConnectionRefused {
            plane: Plane::Command,
            url: "http://127.0.0.1:3002/api/auth-status".into(),
            reason: "connection refused".into(),
        };
        let tool_err = ToolError::from(refused);
        assert_eq!(tool_err.code(), "BRIDGE_UNAVAILABLE");
        assert!(tool_err.to_string().contains("command-plane"));
    }

    #[test]
    fn test_host_codes_map_to_taxonomy() {
        let dup = BridgeError::HostReportedFailure {
            message: "A report named 'CustomerList' already exists".into(),
            code: Some(error_codes::DUPLICATE_NAME.into()),
        };
        assert!(matches!(ToolError::from(dup), ToolError::DuplicateName(_)));

        let other = BridgeError::HostReportedFailure {
            message: "disk full".into(),
            code: None,
        };
        assert!(matches!(ToolError::from(other), ToolError::HostRejected(_)));
    }

    #[test]
    fn test_validation_failure_lists_violations() {
        let err = ToolError::ValidationFailed(vec![
            Violation::new("visualizationType", "must be one of: Grid, Navigation"),
            Violation::new("name", "is required"),
        ]);
        let failure = err.to_failure();
        assert_eq!(failure["success"], json!(false));
        assert_eq!(failure["error_code"], json!("VALIDATION_FAILED"));
        assert_eq!(
            failure["violations"],
            json!([
                "visualizationType: must be one of: Grid, Navigation",
                "name: is required"
            ])
        );
    }

    #[test]
    fn test_auth_required_message() {
        let failure = ToolError::AuthRequired.to_failure();
        assert!(failure["error"]
            .as_str()
            .unwrap()
            .starts_with("Authentication required"));
    }
}
