//! MCP Tool Definitions
//!
//! Tool names and input schemas are derived from the entity families and
//! their catalogs: every nested collection a catalog declares gets add,
//! update and move tools, and record schemas are shown in their public shape.

use serde_json::{json, Map, Value};

use appmodel_types::{ChildKind, Family};

use super::protocol::Tool;
use crate::catalog::FamilyCatalog;
use crate::engine::PropertyProjector;
use crate::facade::{Toolbox, ViewCommand};

pub const OWNER_ARG: &str = "owner_object_name";

const OWNER_LOOKUP: &str = "Name of the owning data object. When omitted, the first match in \
                            document order is used.";

/// What a tool does, independent of its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolRoute {
    List(Family),
    Get(Family),
    Add(Family),
    Update(Family),
    Replace(Family),
    AddChild(Family, ChildKind),
    UpdateChild(Family, ChildKind),
    MoveChild(Family, ChildKind),
    OpenView(ViewCommand),
    SaveModel,
    ModelStatus,
    AuthStatus,
}

impl ToolRoute {
    pub fn name(self) -> String {
        match self {
            ToolRoute::List(family) => format!("list_{}", family.collection_slug().replace('-', "_")),
            ToolRoute::Get(family) => format!("get_{}", family.key()),
            ToolRoute::Add(family) => format!("add_{}", family.key()),
            ToolRoute::Update(family) => format!("update_{}", family.key()),
            ToolRoute::Replace(family) => format!("replace_{}", family.key()),
            ToolRoute::AddChild(family, kind) => format!("add_{}_{}", family.key(), kind.key()),
            ToolRoute::UpdateChild(family, kind) => {
                format!("update_{}_{}", family.key(), kind.key())
            }
            ToolRoute::MoveChild(family, kind) => format!("move_{}_{}", family.key(), kind.key()),
            ToolRoute::OpenView(view) => view.tool_name().to_string(),
            ToolRoute::SaveModel => "save_model".into(),
            ToolRoute::ModelStatus => "get_model_status".into(),
            ToolRoute::AuthStatus => "get_auth_status".into(),
        }
    }
}

/// Every route the toolbox serves, in listing order.
pub fn routes(toolbox: &Toolbox) -> Vec<ToolRoute> {
    let mut routes = vec![
        ToolRoute::List(Family::DataObject),
        ToolRoute::Get(Family::DataObject),
        ToolRoute::Add(Family::DataObject),
        ToolRoute::Update(Family::DataObject),
    ];
    for family in Family::ALL.into_iter().filter(|f| f.is_owned()) {
        routes.extend([
            ToolRoute::List(family),
            ToolRoute::Get(family),
            ToolRoute::Add(family),
            ToolRoute::Update(family),
            ToolRoute::Replace(family),
        ]);
        for kind in toolbox.catalog(family).child_kinds() {
            routes.extend([
                ToolRoute::AddChild(family, kind),
                ToolRoute::UpdateChild(family, kind),
                ToolRoute::MoveChild(family, kind),
            ]);
        }
    }
    routes.extend([
        ToolRoute::List(Family::UserStory),
        ToolRoute::Add(Family::UserStory),
        ToolRoute::Update(Family::UserStory),
    ]);
    routes.extend(ViewCommand::ALL.into_iter().map(ToolRoute::OpenView));
    routes.extend([
        ToolRoute::SaveModel,
        ToolRoute::ModelStatus,
        ToolRoute::AuthStatus,
    ]);
    routes
}

/// Get all available MCP tools
pub fn get_tools(toolbox: &Toolbox) -> Vec<Tool> {
    routes(toolbox)
        .into_iter()
        .map(|route| describe(route, toolbox))
        .collect()
}

fn describe(route: ToolRoute, toolbox: &Toolbox) -> Tool {
    let (description, input_schema) = match route {
        ToolRoute::List(Family::DataObject) => (
            "List data objects with their property, report and flow counts.".to_string(),
            object_schema(
                vec![(
                    "data_object_name",
                    string_arg("Only the data object with this name (case-insensitive)"),
                )],
                &[],
            ),
        ),
        ToolRoute::List(Family::UserStory) => (
            "List all user stories.".to_string(),
            object_schema(vec![], &[]),
        ),
        ToolRoute::List(family) => (
            format!(
                "List {}s with their owning data object. Filters match without regard to case.",
                family.label()
            ),
            object_schema(
                vec![
                    (OWNER_ARG, string_arg("Only entities owned by this data object")),
                    (family.name_key(), string_arg("Only entities with this name")),
                ],
                &[],
            ),
        ),

        ToolRoute::Get(family) if family == Family::DataObject => (
            "Get one data object with its properties.".to_string(),
            object_schema(
                vec![(family.name_key(), string_arg("Data object name"))],
                &[family.name_key()],
            ),
        ),
        ToolRoute::Get(family) => (
            format!("Get one {} by name.", family.label()),
            object_schema(
                vec![
                    (family.name_key(), string_arg(&format!("{} name", family.label()))),
                    (OWNER_ARG, string_arg(OWNER_LOOKUP)),
                ],
                &[family.name_key()],
            ),
        ),

        ToolRoute::Add(family) if !family.is_owned() => (
            format!(
                "Add a {}. {}",
                family.label(),
                toolbox.catalog(family).description
            ),
            object_schema(
                vec![(family.key(), record_schema(toolbox.catalog(family), true))],
                &[family.key()],
            ),
        ),
        ToolRoute::Add(family) => (
            format!(
                "Add a {} to a data object. {}",
                family.label(),
                toolbox.catalog(family).description
            ),
            object_schema(
                vec![
                    (OWNER_ARG, string_arg("Data object that will own the new entity")),
                    (family.key(), record_schema(toolbox.catalog(family), true)),
                ],
                &[OWNER_ARG, family.key()],
            ),
        ),

        ToolRoute::Update(Family::UserStory) => (
            "Update fields of a user story.".to_string(),
            object_schema(
                vec![
                    (
                        Family::UserStory.name_key(),
                        string_arg("Story number, or the full story text"),
                    ),
                    ("updates", record_schema(toolbox.catalog(Family::UserStory), false)),
                ],
                &[Family::UserStory.name_key(), "updates"],
            ),
        ),
        ToolRoute::Update(family) => {
            let mut properties = vec![
                (family.name_key(), string_arg(&format!("{} name", family.label()))),
                ("updates", record_schema(toolbox.catalog(family), false)),
            ];
            if family.is_owned() {
                properties.push((OWNER_ARG, string_arg(OWNER_LOOKUP)));
            }
            (
                format!(
                    "Update fields of a {}. Only the fields given are changed.",
                    family.label()
                ),
                object_schema(properties, &[family.name_key(), "updates"]),
            )
        }

        ToolRoute::Replace(family) => (
            format!(
                "Replace a {} with a complete record, nested collections included.",
                family.label()
            ),
            object_schema(
                vec![
                    (family.name_key(), string_arg(&format!("{} to replace", family.label()))),
                    (OWNER_ARG, string_arg(OWNER_LOOKUP)),
                    (family.key(), record_schema(toolbox.catalog(family), true)),
                ],
                &[family.name_key(), family.key()],
            ),
        ),

        ToolRoute::AddChild(family, kind) => (
            format!("Append a {} to a {}.", kind.label(), family.label()),
            object_schema(
                vec![
                    (family.name_key(), string_arg(&format!("{} name", family.label()))),
                    (OWNER_ARG, string_arg(OWNER_LOOKUP)),
                    (kind.key(), child_schema(toolbox.catalog(family), kind, true)),
                ],
                &[family.name_key(), kind.key()],
            ),
        ),
        ToolRoute::UpdateChild(family, kind) => (
            format!("Update fields of a {} in a {}.", kind.label(), family.label()),
            object_schema(
                vec![
                    (family.name_key(), string_arg(&format!("{} name", family.label()))),
                    (OWNER_ARG, string_arg(OWNER_LOOKUP)),
                    (kind.name_key(), string_arg(&format!("{} to update", kind.label()))),
                    ("updates", child_schema(toolbox.catalog(family), kind, false)),
                ],
                &[family.name_key(), kind.name_key(), "updates"],
            ),
        ),
        ToolRoute::MoveChild(family, kind) => (
            format!(
                "Move a {} of a {} to a new zero-based position.",
                kind.label(),
                family.label()
            ),
            object_schema(
                vec![
                    (family.name_key(), string_arg(&format!("{} name", family.label()))),
                    (OWNER_ARG, string_arg(OWNER_LOOKUP)),
                    (
                        kind.name_key(),
                        string_arg(&format!("{} to move (exact match)", kind.label())),
                    ),
                    (
                        "new_position",
                        json!({"type": "integer", "description": "Target index, 0 to count - 1"}),
                    ),
                ],
                &[family.name_key(), kind.name_key(), "new_position"],
            ),
        ),

        ToolRoute::OpenView(view) => {
            let schema = match view.target_arg() {
                Some(arg) => object_schema(vec![(arg, string_arg("Entity to show"))], &[arg]),
                None => object_schema(vec![], &[]),
            };
            (view.description().to_string(), schema)
        }
        ToolRoute::SaveModel => (
            "Save the model document to disk.".to_string(),
            object_schema(vec![], &[]),
        ),
        ToolRoute::ModelStatus => (
            "Report unsaved changes and entity counts of the open model.".to_string(),
            object_schema(vec![], &[]),
        ),
        ToolRoute::AuthStatus => (
            "Report whether the user is logged in to the model services.".to_string(),
            object_schema(vec![], &[]),
        ),
    };
    Tool {
        name: route.name(),
        description: description.trim_end().to_string(),
        input_schema,
    }
}

fn string_arg(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

fn object_schema(properties: Vec<(&str, Value)>, required: &[&str]) -> Value {
    let properties: Map<String, Value> = properties
        .into_iter()
        .map(|(name, schema)| (name.to_string(), schema))
        .collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Public-shape schema of a family record; partial schemas drop `required`.
fn record_schema(catalog: &FamilyCatalog, full: bool) -> Value {
    PropertyProjector::new(&catalog.projection)
        .to_public_schema(&catalog.schema.to_json_schema(full))
}

fn child_schema(catalog: &FamilyCatalog, kind: ChildKind, full: bool) -> Value {
    match catalog.child(kind) {
        Some(child) => PropertyProjector::new(&child.projection)
            .to_public_schema(&child.schema.to_json_schema(full)),
        None => json!({"type": "object"}),
    }
}
