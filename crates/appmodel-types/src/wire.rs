//! Bridge wire envelopes.
//!
//! Data plane:
//!   GET  /api/<collection>[?owner_object_name=..&<entity>_name=..]
//!   POST /api/<verb>-<family>[-<child>]
//! Command plane:
//!   POST /api/execute-command
//!   GET  /api/auth-status

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The two bridge endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plane {
    /// Queries and document mutations.
    Data,
    /// Host actions and the auth probe.
    Command,
}

impl std::fmt::Display for Plane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Plane::Data => f.write_str("data-plane"),
            Plane::Command => f.write_str("command-plane"),
        }
    }
}

/// Stable failure codes carried in `error_code`.
pub mod error_codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const DUPLICATE_NAME: &str = "DUPLICATE_NAME";
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
    pub const INVALID_POSITION: &str = "INVALID_POSITION";
    pub const KIND_MISMATCH: &str = "KIND_MISMATCH";
    pub const UNKNOWN_COMMAND: &str = "UNKNOWN_COMMAND";
    pub const SAVE_FAILED: &str = "SAVE_FAILED";
}

/// Acknowledgement of a data-plane mutation.
///
/// The entity travels under its family key (`report`, `workflow`, ...), so it
/// is kept in `rest` and read with [`HostAck::entity`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostAck {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_object_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_position: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_position: Option<usize>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl HostAck {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failure(code: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            error_code: Some(code.to_string()),
            ..Default::default()
        }
    }

    pub fn with_entity(mut self, key: &str, entity: Value) -> Self {
        self.rest.insert(key.to_string(), entity);
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner_object_name = Some(owner.into());
        self
    }

    pub fn with_positions(mut self, old_position: usize, new_position: usize) -> Self {
        self.old_position = Some(old_position);
        self.new_position = Some(new_position);
        self
    }

    pub fn entity(&self, key: &str) -> Option<&Value> {
        self.rest.get(key)
    }
}

/// One entry of a list response: the entity plus the data object holding it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatedRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_object_name: Option<String>,
    pub entity: Value,
}

/// Body of `POST /api/execute-command`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

/// Body of `GET /api/auth-status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthStatus {
    pub success: bool,
    #[serde(rename = "isLoggedIn")]
    pub is_logged_in: bool,
}

/// Body of `GET /api/model-status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub success: bool,
    pub has_unsaved_changes: bool,
    pub data_object_count: usize,
    pub user_story_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kind_conflicts: Vec<String>,
}
