//! Entity families and their nested child collections.
//!
//! A family names one kind of top-level entity the tools operate on. Its slug
//! forms the data-plane action path (`add-report`, `move-workflow-param`) and
//! its key names the body field carrying the entity.

use serde::{Deserialize, Serialize};

use crate::kind::FlowKind;

/// Top-level entity family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    DataObject,
    Report,
    Workflow,
    GeneralFlow,
    PageInitFlow,
    UserStory,
}

impl Family {
    pub const ALL: [Family; 6] = [
        Family::DataObject,
        Family::Report,
        Family::Workflow,
        Family::GeneralFlow,
        Family::PageInitFlow,
        Family::UserStory,
    ];

    /// Path segment used in data-plane routes.
    pub fn slug(self) -> &'static str {
        match self {
            Family::DataObject => "data-object",
            Family::Report => "report",
            Family::Workflow => "workflow",
            Family::GeneralFlow => "general-flow",
            Family::PageInitFlow => "page-init-flow",
            Family::UserStory => "user-story",
        }
    }

    /// Plural path segment used by list endpoints.
    pub fn collection_slug(self) -> &'static str {
        match self {
            Family::DataObject => "data-objects",
            Family::Report => "reports",
            Family::Workflow => "workflows",
            Family::GeneralFlow => "general-flows",
            Family::PageInitFlow => "page-init-flows",
            Family::UserStory => "user-stories",
        }
    }

    /// Body/response key carrying the entity itself.
    pub fn key(self) -> &'static str {
        match self {
            Family::DataObject => "data_object",
            Family::Report => "report",
            Family::Workflow => "workflow",
            Family::GeneralFlow => "general_flow",
            Family::PageInitFlow => "page_init_flow",
            Family::UserStory => "user_story",
        }
    }

    /// Body/query key carrying the entity's identifying name.
    pub fn name_key(self) -> &'static str {
        match self {
            Family::DataObject => "data_object_name",
            Family::Report => "report_name",
            Family::Workflow => "workflow_name",
            Family::GeneralFlow => "general_flow_name",
            Family::PageInitFlow => "page_init_flow_name",
            Family::UserStory => "story_number",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Family::DataObject => "data object",
            Family::Report => "report",
            Family::Workflow => "workflow",
            Family::GeneralFlow => "general flow",
            Family::PageInitFlow => "page init flow",
            Family::UserStory => "user story",
        }
    }

    /// Flow kind stored in `objectWorkflow` for the flow families.
    pub fn flow_kind(self) -> Option<FlowKind> {
        match self {
            Family::Workflow => Some(FlowKind::Workflow),
            Family::GeneralFlow => Some(FlowKind::GeneralFlow),
            Family::PageInitFlow => Some(FlowKind::PageInitFlow),
            _ => None,
        }
    }

    /// True for families owned by a data object.
    pub fn is_owned(self) -> bool {
        matches!(
            self,
            Family::Report | Family::Workflow | Family::GeneralFlow | Family::PageInitFlow
        )
    }

    pub fn from_slug(slug: &str) -> Option<Family> {
        Family::ALL.into_iter().find(|f| f.slug() == slug)
    }

    pub fn from_collection_slug(slug: &str) -> Option<Family> {
        Family::ALL.into_iter().find(|f| f.collection_slug() == slug)
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Nested collection kind inside a report or flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildKind {
    Column,
    Button,
    Param,
    OutputVar,
    Task,
}

impl ChildKind {
    pub const ALL: [ChildKind; 5] = [
        ChildKind::Column,
        ChildKind::Button,
        ChildKind::Param,
        ChildKind::OutputVar,
        ChildKind::Task,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            ChildKind::Column => "column",
            ChildKind::Button => "button",
            ChildKind::Param => "param",
            ChildKind::OutputVar => "output-var",
            ChildKind::Task => "task",
        }
    }

    /// Body key carrying the item payload.
    pub fn key(self) -> &'static str {
        match self {
            ChildKind::Column => "column",
            ChildKind::Button => "button",
            ChildKind::Param => "param",
            ChildKind::OutputVar => "output_var",
            ChildKind::Task => "task",
        }
    }

    /// Body key carrying the item's identifying name.
    pub fn name_key(self) -> &'static str {
        match self {
            ChildKind::Column => "column_name",
            ChildKind::Button => "button_text",
            ChildKind::Param => "param_name",
            ChildKind::OutputVar => "output_var_name",
            ChildKind::Task => "task_name",
        }
    }

    /// Attribute inside the item that identifies it within its parent.
    pub fn key_field(self) -> &'static str {
        match self {
            ChildKind::Button => "buttonText",
            _ => "name",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChildKind::Column => "column",
            ChildKind::Button => "button",
            ChildKind::Param => "parameter",
            ChildKind::OutputVar => "output variable",
            ChildKind::Task => "task",
        }
    }

    /// Document array holding this child kind under `family`, if the family has one.
    pub fn collection_field(self, family: Family) -> Option<&'static str> {
        match (family, self) {
            (Family::Report, ChildKind::Column) => Some("reportColumn"),
            (Family::Report, ChildKind::Button) => Some("reportButton"),
            (Family::Report, ChildKind::Param) => Some("reportParam"),
            (Family::Workflow | Family::GeneralFlow | Family::PageInitFlow, ChildKind::Param) => {
                Some("objectWorkflowParam")
            }
            (
                Family::Workflow | Family::GeneralFlow | Family::PageInitFlow,
                ChildKind::OutputVar,
            ) => Some("objectWorkflowOutputVar"),
            (Family::GeneralFlow | Family::PageInitFlow, ChildKind::Button) => {
                Some("objectWorkflowButton")
            }
            (Family::Workflow, ChildKind::Task) => Some("dynaFlowTask"),
            _ => None,
        }
    }

    pub fn from_slug(slug: &str) -> Option<ChildKind> {
        ChildKind::ALL.into_iter().find(|c| c.slug() == slug)
    }
}

impl std::fmt::Display for ChildKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
