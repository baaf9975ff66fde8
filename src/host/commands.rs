//! Command-plane session: login state and the host commands it accepts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::Mutex;

use appmodel_types::{error_codes, AuthStatus, CommandRequest, CommandResponse};

use crate::facade::commands::{ViewCommand, SAVE_MODEL_COMMAND};

pub const LOGIN_COMMAND: &str = "appmodel.login";
pub const LOGOUT_COMMAND: &str = "appmodel.logout";

pub struct HostSession {
    logged_in: AtomicBool,
    auth_delay: Option<Duration>,
    opened: Mutex<Vec<CommandRequest>>,
}

impl HostSession {
    pub fn new(logged_in: bool, auth_delay: Option<Duration>) -> Self {
        Self {
            logged_in: AtomicBool::new(logged_in),
            auth_delay,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    pub fn set_logged_in(&self, logged_in: bool) {
        self.logged_in.store(logged_in, Ordering::SeqCst);
    }

    /// Answer the auth probe, after the configured delay if any.
    pub async fn auth_status(&self) -> AuthStatus {
        if let Some(delay) = self.auth_delay {
            tokio::time::sleep(delay).await;
        }
        AuthStatus {
            success: true,
            is_logged_in: self.is_logged_in(),
        }
    }

    /// View commands received so far, oldest first.
    pub async fn opened_views(&self) -> Vec<CommandRequest> {
        self.opened.lock().await.clone()
    }

    /// Run a command other than save; save needs the document store.
    pub async fn execute(&self, request: CommandRequest) -> CommandResponse {
        let command = request.command.clone();
        match command.as_str() {
            LOGIN_COMMAND => {
                self.set_logged_in(true);
                accepted(json!({"isLoggedIn": true}))
            }
            LOGOUT_COMMAND => {
                self.set_logged_in(false);
                accepted(json!({"isLoggedIn": false}))
            }
            command if ViewCommand::ALL.iter().any(|v| v.command() == command) => {
                tracing::info!(command, args = ?request.args, "view opened");
                let result = json!({"opened": command, "args": request.args.clone()});
                self.opened.lock().await.push(request);
                accepted(result)
            }
            SAVE_MODEL_COMMAND => rejected(
                error_codes::INVALID_REQUEST,
                "save must be handled by the document store",
            ),
            unknown => rejected(
                error_codes::UNKNOWN_COMMAND,
                format!("Unknown command: {unknown}"),
            ),
        }
    }
}

pub(crate) fn accepted(result: Value) -> CommandResponse {
    CommandResponse {
        success: true,
        result: Some(result),
        ..Default::default()
    }
}

pub(crate) fn rejected(code: &str, error: impl Into<String>) -> CommandResponse {
    CommandResponse {
        success: false,
        error: Some(error.into()),
        error_code: Some(code.to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_view_commands_are_recorded() {
        let session = HostSession::new(true, None);
        let response = session
            .execute(CommandRequest::new(
                ViewCommand::ReportDetails.command(),
                vec![json!("CustomerList")],
            ))
            .await;
        assert!(response.success);
        let opened = session.opened_views().await;
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].args, vec![json!("CustomerList")]);
    }

    #[tokio::test]
    async fn test_login_toggles_auth() {
        let session = HostSession::new(false, None);
        assert!(!session.auth_status().await.is_logged_in);
        session.execute(CommandRequest::new(LOGIN_COMMAND, vec![])).await;
        assert!(session.auth_status().await.is_logged_in);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let session = HostSession::new(true, None);
        let response = session
            .execute(CommandRequest::new("appmodel.formatDisk", vec![]))
            .await;
        assert!(!response.success);
        assert_eq!(response.error_code.as_deref(), Some("UNKNOWN_COMMAND"));
    }
}
