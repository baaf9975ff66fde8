//! Command-plane tools: host views, save, auth status and model status.

use std::sync::Arc;

use serde_json::{json, Value};

use appmodel_types::{CommandRequest, CommandResponse, ModelStatus, Plane};

use super::parse;
use crate::bridge::{AuthGate, Bridge, BridgeRequest};
use crate::config::TimeoutClass;
use crate::error::ToolError;

pub const EXECUTE_COMMAND_PATH: &str = "/api/execute-command";
pub const MODEL_STATUS_PATH: &str = "/api/model-status";
pub const SAVE_MODEL_COMMAND: &str = "appmodel.saveModel";

/// A host view that a tool can ask the host to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewCommand {
    ReportDetails,
    WorkflowDetails,
    GeneralFlowDetails,
    PageInitFlowDetails,
    DataObjectDetails,
    UserStories,
    HierarchyDiagram,
    ModelFeatureCatalog,
    ModelAiProcessing,
    FabricationRequests,
}

impl ViewCommand {
    pub const ALL: [ViewCommand; 10] = [
        ViewCommand::ReportDetails,
        ViewCommand::WorkflowDetails,
        ViewCommand::GeneralFlowDetails,
        ViewCommand::PageInitFlowDetails,
        ViewCommand::DataObjectDetails,
        ViewCommand::UserStories,
        ViewCommand::HierarchyDiagram,
        ViewCommand::ModelFeatureCatalog,
        ViewCommand::ModelAiProcessing,
        ViewCommand::FabricationRequests,
    ];

    /// Host command identifier.
    pub fn command(self) -> &'static str {
        match self {
            ViewCommand::ReportDetails => "appmodel.showReportDetails",
            ViewCommand::WorkflowDetails => "appmodel.showWorkflowDetails",
            ViewCommand::GeneralFlowDetails => "appmodel.showGeneralFlowDetails",
            ViewCommand::PageInitFlowDetails => "appmodel.showPageInitFlowDetails",
            ViewCommand::DataObjectDetails => "appmodel.showDataObjectDetails",
            ViewCommand::UserStories => "appmodel.showUserStories",
            ViewCommand::HierarchyDiagram => "appmodel.showHierarchyDiagram",
            ViewCommand::ModelFeatureCatalog => "appmodel.showModelFeatureCatalog",
            ViewCommand::ModelAiProcessing => "appmodel.showModelAIProcessing",
            ViewCommand::FabricationRequests => "appmodel.showFabricationRequests",
        }
    }

    /// MCP tool name.
    pub fn tool_name(self) -> &'static str {
        match self {
            ViewCommand::ReportDetails => "open_report_details",
            ViewCommand::WorkflowDetails => "open_workflow_details",
            ViewCommand::GeneralFlowDetails => "open_general_flow_details",
            ViewCommand::PageInitFlowDetails => "open_page_init_flow_details",
            ViewCommand::DataObjectDetails => "open_data_object_details",
            ViewCommand::UserStories => "open_user_stories",
            ViewCommand::HierarchyDiagram => "open_hierarchy_diagram",
            ViewCommand::ModelFeatureCatalog => "open_model_feature_catalog",
            ViewCommand::ModelAiProcessing => "open_model_ai_processing",
            ViewCommand::FabricationRequests => "open_fabrication_requests",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ViewCommand::ReportDetails => "Open the details view of a report.",
            ViewCommand::WorkflowDetails => "Open the details view of a workflow.",
            ViewCommand::GeneralFlowDetails => "Open the details view of a general flow.",
            ViewCommand::PageInitFlowDetails => "Open the details view of a page init flow.",
            ViewCommand::DataObjectDetails => "Open the details view of a data object.",
            ViewCommand::UserStories => "Open the user stories view.",
            ViewCommand::HierarchyDiagram => "Open the data object hierarchy diagram.",
            ViewCommand::ModelFeatureCatalog => {
                "Open the model feature catalog (requires login to the model services)."
            }
            ViewCommand::ModelAiProcessing => {
                "Open the model AI processing requests view (requires login)."
            }
            ViewCommand::FabricationRequests => {
                "Open the model fabrication requests view (requires login)."
            }
        }
    }

    /// Name argument the view is opened for, if any.
    pub fn target_arg(self) -> Option<&'static str> {
        match self {
            ViewCommand::ReportDetails => Some("report_name"),
            ViewCommand::WorkflowDetails => Some("workflow_name"),
            ViewCommand::GeneralFlowDetails => Some("general_flow_name"),
            ViewCommand::PageInitFlowDetails => Some("page_init_flow_name"),
            ViewCommand::DataObjectDetails => Some("data_object_name"),
            _ => None,
        }
    }

    /// Views backed by the remote model services.
    pub fn requires_auth(self) -> bool {
        matches!(
            self,
            ViewCommand::ModelFeatureCatalog
                | ViewCommand::ModelAiProcessing
                | ViewCommand::FabricationRequests
        )
    }

    pub fn from_tool_name(name: &str) -> Option<ViewCommand> {
        ViewCommand::ALL.into_iter().find(|v| v.tool_name() == name)
    }
}

pub struct CommandFacade {
    bridge: Arc<dyn Bridge>,
    auth: AuthGate,
}

impl CommandFacade {
    pub(crate) fn new(bridge: Arc<dyn Bridge>, auth: AuthGate) -> Self {
        Self { bridge, auth }
    }

    async fn execute(
        &self,
        command: &str,
        args: Vec<Value>,
        timeout: TimeoutClass,
    ) -> Result<CommandResponse, ToolError> {
        let body = serde_json::to_value(CommandRequest::new(command, args))
            .map_err(|e| ToolError::MalformedResponse(e.to_string()))?;
        let request = BridgeRequest::post(Plane::Command, EXECUTE_COMMAND_PATH, body, timeout);
        let response: CommandResponse = parse(self.bridge.exchange(request).await?, command)?;
        tracing::info!(command, "host command executed");
        Ok(response)
    }

    /// Ask the host to open a view; auth-flagged views probe login first.
    #[tracing::instrument(skip(self))]
    pub async fn open_view(&self, view: ViewCommand, target: Option<&str>) -> Result<Value, ToolError> {
        if view.requires_auth() && !self.auth.require_auth().await {
            return Err(ToolError::AuthRequired);
        }
        let args = target.map(|t| vec![json!(t)]).unwrap_or_default();
        let response = self.execute(view.command(), args, TimeoutClass::Mutation).await?;
        Ok(json!({
            "success": true,
            "command": view.command(),
            "result": response.result,
        }))
    }

    /// Persist the host's document to disk.
    pub async fn save_model(&self) -> Result<Value, ToolError> {
        let response = self
            .execute(SAVE_MODEL_COMMAND, Vec::new(), TimeoutClass::Bulk)
            .await?;
        Ok(json!({
            "success": true,
            "result": response.result,
        }))
    }

    pub async fn auth_status(&self) -> Value {
        json!({
            "success": true,
            "isLoggedIn": self.auth.require_auth().await,
        })
    }

    pub async fn model_status(&self) -> Result<Value, ToolError> {
        let request = BridgeRequest::get(Plane::Data, MODEL_STATUS_PATH, TimeoutClass::Fetch);
        let status: ModelStatus = parse(self.bridge.exchange(request).await?, "model status")?;
        serde_json::to_value(status).map_err(|e| ToolError::MalformedResponse(e.to_string()))
    }
}
