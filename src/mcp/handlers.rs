//! MCP Tool Handlers
//!
//! Resolves a tool name to its route and calls the matching facade. Missing
//! or mistyped arguments fail the tool call itself; everything a facade
//! reports comes back as a structured `{success: false, ...}` result.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use serde_json::{Map, Value};

use appmodel_types::Family;

use super::protocol::{Tool, ToolCallResult};
use super::tools::{get_tools, routes, ToolRoute, OWNER_ARG};
use crate::error::ToolError;
use crate::facade::{OwnedFacade, Toolbox};

/// Tool handlers with bridge access
pub struct ToolHandlers {
    toolbox: Toolbox,
    routes: HashMap<String, ToolRoute>,
}

impl ToolHandlers {
    pub fn new(toolbox: Toolbox) -> Self {
        let routes = routes(&toolbox)
            .into_iter()
            .map(|route| (route.name(), route))
            .collect();
        Self { toolbox, routes }
    }

    pub fn tools(&self) -> Vec<Tool> {
        get_tools(&self.toolbox)
    }

    /// Handle a tool call by name
    pub async fn handle(&self, name: &str, args: Value) -> ToolCallResult {
        match self.dispatch(name, args).await {
            Ok(Ok(v)) => ToolCallResult::json(&v),
            Ok(Err(err)) => {
                tracing::warn!(tool = name, code = err.code(), error = %err, "tool call failed");
                ToolCallResult::failure(&err)
            }
            Err(e) => ToolCallResult::error(e.to_string()),
        }
    }

    async fn dispatch(&self, name: &str, args: Value) -> Result<Result<Value, ToolError>> {
        let route = *self
            .routes
            .get(name)
            .ok_or_else(|| anyhow!("Unknown tool: {}", name))?;
        let toolbox = &self.toolbox;

        let outcome = match route {
            ToolRoute::List(Family::DataObject) => {
                toolbox
                    .data_objects
                    .list(optional_str(&args, Family::DataObject.name_key()))
                    .await
            }
            ToolRoute::List(Family::UserStory) => toolbox.user_stories.list().await,
            ToolRoute::List(family) => {
                self.owned(family)?
                    .list(
                        optional_str(&args, OWNER_ARG),
                        optional_str(&args, family.name_key()),
                    )
                    .await
            }

            ToolRoute::Get(Family::DataObject) => {
                toolbox
                    .data_objects
                    .get(required_str(&args, Family::DataObject.name_key())?)
                    .await
            }
            ToolRoute::Get(family) => {
                self.owned(family)?
                    .get(
                        required_str(&args, family.name_key())?,
                        optional_str(&args, OWNER_ARG),
                    )
                    .await
            }

            ToolRoute::Add(Family::DataObject) => {
                toolbox
                    .data_objects
                    .add(required_object(&args, Family::DataObject.key())?)
                    .await
            }
            ToolRoute::Add(Family::UserStory) => {
                toolbox
                    .user_stories
                    .add(required_object(&args, Family::UserStory.key())?)
                    .await
            }
            ToolRoute::Add(family) => {
                self.owned(family)?
                    .add(
                        required_str(&args, OWNER_ARG)?,
                        required_object(&args, family.key())?,
                    )
                    .await
            }

            ToolRoute::Update(Family::DataObject) => {
                toolbox
                    .data_objects
                    .update(
                        required_str(&args, Family::DataObject.name_key())?,
                        required_object(&args, "updates")?,
                    )
                    .await
            }
            ToolRoute::Update(Family::UserStory) => {
                let key = story_key(&args)?;
                toolbox
                    .user_stories
                    .update(&key, required_object(&args, "updates")?)
                    .await
            }
            ToolRoute::Update(family) => {
                self.owned(family)?
                    .update(
                        required_str(&args, family.name_key())?,
                        optional_str(&args, OWNER_ARG),
                        required_object(&args, "updates")?,
                    )
                    .await
            }

            ToolRoute::Replace(family) => {
                self.owned(family)?
                    .replace(
                        required_str(&args, family.name_key())?,
                        optional_str(&args, OWNER_ARG),
                        required_object(&args, family.key())?,
                    )
                    .await
            }

            ToolRoute::AddChild(family, kind) => {
                self.owned(family)?
                    .add_child(
                        kind,
                        required_str(&args, family.name_key())?,
                        optional_str(&args, OWNER_ARG),
                        required_object(&args, kind.key())?,
                    )
                    .await
            }
            ToolRoute::UpdateChild(family, kind) => {
                self.owned(family)?
                    .update_child(
                        kind,
                        required_str(&args, family.name_key())?,
                        optional_str(&args, OWNER_ARG),
                        required_str(&args, kind.name_key())?,
                        required_object(&args, "updates")?,
                    )
                    .await
            }
            ToolRoute::MoveChild(family, kind) => {
                let new_position = args["new_position"]
                    .as_i64()
                    .ok_or_else(|| anyhow!("new_position required (integer)"))?;
                self.owned(family)?
                    .move_child(
                        kind,
                        required_str(&args, family.name_key())?,
                        optional_str(&args, OWNER_ARG),
                        required_str(&args, kind.name_key())?,
                        new_position,
                    )
                    .await
            }

            ToolRoute::OpenView(view) => {
                let target = match view.target_arg() {
                    Some(arg) => Some(required_str(&args, arg)?),
                    None => None,
                };
                toolbox.commands.open_view(view, target).await
            }
            ToolRoute::SaveModel => toolbox.commands.save_model().await,
            ToolRoute::ModelStatus => toolbox.commands.model_status().await,
            ToolRoute::AuthStatus => Ok(toolbox.commands.auth_status().await),
        };

        Ok(outcome)
    }

    fn owned(&self, family: Family) -> Result<&OwnedFacade> {
        self.toolbox
            .owned(family)
            .ok_or_else(|| anyhow!("no {} tools", family.label()))
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args[key]
        .as_str()
        .ok_or_else(|| anyhow!("{} required", key))
}

fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args[key].as_str().filter(|s| !s.is_empty())
}

fn required_object<'a>(args: &'a Value, key: &str) -> Result<&'a Map<String, Value>> {
    args[key]
        .as_object()
        .ok_or_else(|| anyhow!("{} required (object)", key))
}

/// Story numbers may arrive as strings or bare numbers.
fn story_key(args: &Value) -> Result<String> {
    let key = Family::UserStory.name_key();
    match &args[key] {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(anyhow!("{} required", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::catalog::Catalogs;
    use crate::error::BridgeError;
    use crate::facade::testing::ScriptedBridge;

    fn handlers(answers: Vec<Result<Value, BridgeError>>) -> (ToolHandlers, Arc<ScriptedBridge>) {
        let bridge = Arc::new(ScriptedBridge::new(answers));
        let catalogs = Catalogs::builtin().unwrap();
        let toolbox = Toolbox::new(bridge.clone(), &catalogs).unwrap();
        (ToolHandlers::new(toolbox), bridge)
    }

    fn body(result: &ToolCallResult) -> Value {
        serde_json::from_str(&result.content[0].text).unwrap()
    }

    fn snapshot() -> Value {
        json!([
            {"name": "Customer", "report": [{
                "name": "CustomerList",
                "reportColumn": [{"name": "A"}, {"name": "B"}, {"name": "C"}, {"name": "D"}]
            }]}
        ])
    }

    #[tokio::test]
    async fn test_unknown_tool_is_call_error() {
        let (handlers, _) = handlers(vec![]);
        let result = handlers.handle("drop_database", json!({})).await;
        assert_eq!(result.is_error, Some(true));
        assert!(result.content[0].text.contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_missing_argument_is_call_error() {
        let (handlers, bridge) = handlers(vec![]);
        let result = handlers.handle("get_report", json!({})).await;
        assert_eq!(result.is_error, Some(true));
        assert_eq!(result.content[0].text, "report_name required");
        assert!(bridge.requests().is_empty());
    }

    #[tokio::test]
    async fn test_facade_failure_is_structured() {
        let (handlers, _) = handlers(vec![Ok(snapshot())]);
        let result = handlers
            .handle("get_report", json!({"report_name": "OrderList"}))
            .await;
        assert_eq!(result.is_error, None);
        let body = body(&result);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error_code"], json!("NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_move_column_routes_to_action() {
        let ack = json!({"success": true, "owner_object_name": "Customer", "old_position": 1, "new_position": 3});
        let (handlers, bridge) = handlers(vec![Ok(snapshot()), Ok(ack)]);
        let result = handlers
            .handle(
                "move_report_column",
                json!({"report_name": "CustomerList", "column_name": "B", "new_position": 3}),
            )
            .await;
        let body = body(&result);
        assert_eq!(body["success"], json!(true));
        let requests = bridge.requests();
        assert_eq!(requests[1].path, "/api/move-report-column");
        assert_eq!(requests[1].body.as_ref().unwrap()["new_position"], json!(3));
    }

    #[tokio::test]
    async fn test_move_needs_integer_position() {
        let (handlers, _) = handlers(vec![]);
        let result = handlers
            .handle(
                "move_report_column",
                json!({"report_name": "CustomerList", "column_name": "B", "new_position": "last"}),
            )
            .await;
        assert_eq!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_story_number_accepts_numbers() {
        let stories = json!([{"storyNumber": "7", "storyText": "A Clerk wants to ship"}]);
        let (handlers, bridge) = handlers(vec![Ok(stories), Ok(json!({"success": true}))]);
        handlers
            .handle(
                "update_user_story",
                json!({"story_number": 7, "updates": {"isIgnored": "true"}}),
            )
            .await;
        assert_eq!(bridge.requests()[1].path, "/api/update-user-story");
    }
}
