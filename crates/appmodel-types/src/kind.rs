//! Flow kind discriminants.
//!
//! Page-init flows, workflows, workflow tasks and general flows share one
//! physical array (`objectWorkflow`). Their logical kind is derived from the
//! record's name suffix and two string flags, and the four kinds are mutually
//! exclusive.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name suffixes that mark a page-init flow (matched case-insensitively).
pub const PAGE_INIT_SUFFIXES: [&str; 2] = ["InitObjWF", "InitReport"];

/// Logical kind of a record in the shared `objectWorkflow` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    PageInitFlow,
    Workflow,
    WorkflowTask,
    GeneralFlow,
}

impl FlowKind {
    /// Classify a record from its discriminants.
    ///
    /// Exactly one of the three positive discriminants may apply; a record
    /// matching none is a general flow.
    pub fn classify(
        name: &str,
        is_dyna_flow: Option<&str>,
        is_dyna_flow_task: Option<&str>,
    ) -> Result<FlowKind, KindConflict> {
        let mut matched = Vec::new();
        if has_page_init_suffix(name) {
            matched.push(FlowKind::PageInitFlow);
        }
        if is_dyna_flow == Some("true") {
            matched.push(FlowKind::Workflow);
        }
        if is_dyna_flow_task == Some("true") {
            matched.push(FlowKind::WorkflowTask);
        }

        match matched.as_slice() {
            [] => Ok(FlowKind::GeneralFlow),
            [kind] => Ok(*kind),
            _ => Err(KindConflict {
                name: name.to_string(),
                matched,
            }),
        }
    }

    /// Human-readable label used in messages.
    pub fn label(self) -> &'static str {
        match self {
            FlowKind::PageInitFlow => "page init flow",
            FlowKind::Workflow => "workflow",
            FlowKind::WorkflowTask => "workflow task",
            FlowKind::GeneralFlow => "general flow",
        }
    }
}

impl std::fmt::Display for FlowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A record whose discriminants select more than one kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{name}' matches more than one flow kind: {}", format_kinds(matched))]
pub struct KindConflict {
    pub name: String,
    pub matched: Vec<FlowKind>,
}

fn format_kinds(kinds: &[FlowKind]) -> String {
    kinds
        .iter()
        .map(|k| k.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Classification state stored on a flow record after load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Classification {
    #[default]
    Unclassified,
    Kind(FlowKind),
    Conflict(KindConflict),
}

/// True when `name` ends with one of [`PAGE_INIT_SUFFIXES`], ignoring case.
pub fn has_page_init_suffix(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    PAGE_INIT_SUFFIXES
        .iter()
        .any(|suffix| lower.ends_with(&suffix.to_ascii_lowercase()))
}
