//! Application model document.
//!
//! Records type the fields the engine reasons about (names, discriminants,
//! nested collections) and keep every other attribute in a flattened map so a
//! read/modify/write cycle never drops fields this crate does not know about.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::family::ChildKind;
use crate::kind::{Classification, FlowKind, KindConflict};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("document has no namespace")]
    NoNamespace,
}

/// Root of the model file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub root: ModelRoot,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelRoot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespace: Vec<Namespace>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub object: Vec<DataObject>,
    #[serde(rename = "userStory", default, skip_serializing_if = "Vec::is_empty")]
    pub user_story: Vec<UserStory>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataObject {
    pub name: String,
    #[serde(
        rename = "parentObjectName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_object_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub report: Vec<Report>,
    #[serde(
        rename = "objectWorkflow",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub object_workflow: Vec<FlowRecord>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Nested collection item (column, button, parameter, output variable, task).
///
/// Items are attribute records; the identifying attribute depends on the
/// collection (see [`ChildKind::key_field`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item {
    pub attributes: Map<String, Value>,
}

impl Item {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self { attributes }
    }

    /// String attribute, if present.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.attributes.get(field).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub name: String,
    #[serde(rename = "reportColumn", default, skip_serializing_if = "Vec::is_empty")]
    pub report_column: Vec<Item>,
    #[serde(rename = "reportButton", default, skip_serializing_if = "Vec::is_empty")]
    pub report_button: Vec<Item>,
    #[serde(rename = "reportParam", default, skip_serializing_if = "Vec::is_empty")]
    pub report_param: Vec<Item>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Report {
    pub fn children(&self, kind: ChildKind) -> Option<&Vec<Item>> {
        match kind {
            ChildKind::Column => Some(&self.report_column),
            ChildKind::Button => Some(&self.report_button),
            ChildKind::Param => Some(&self.report_param),
            ChildKind::OutputVar | ChildKind::Task => None,
        }
    }

    pub fn children_mut(&mut self, kind: ChildKind) -> Option<&mut Vec<Item>> {
        match kind {
            ChildKind::Column => Some(&mut self.report_column),
            ChildKind::Button => Some(&mut self.report_button),
            ChildKind::Param => Some(&mut self.report_param),
            ChildKind::OutputVar | ChildKind::Task => None,
        }
    }
}

/// A record of the shared `objectWorkflow` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub name: String,
    #[serde(rename = "isDynaFlow", default, skip_serializing_if = "Option::is_none")]
    pub is_dyna_flow: Option<String>,
    #[serde(
        rename = "isDynaFlowTask",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_dyna_flow_task: Option<String>,
    #[serde(
        rename = "objectWorkflowParam",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub object_workflow_param: Vec<Item>,
    #[serde(
        rename = "objectWorkflowOutputVar",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub object_workflow_output_var: Vec<Item>,
    #[serde(
        rename = "objectWorkflowButton",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub object_workflow_button: Vec<Item>,
    #[serde(rename = "dynaFlowTask", default, skip_serializing_if = "Vec::is_empty")]
    pub dyna_flow_task: Vec<Item>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
    #[serde(skip)]
    pub classification: Classification,
}

impl FlowRecord {
    /// Compute and store the record's kind.
    pub fn classify(&mut self) -> &Classification {
        self.classification = match FlowKind::classify(
            &self.name,
            self.is_dyna_flow.as_deref(),
            self.is_dyna_flow_task.as_deref(),
        ) {
            Ok(kind) => Classification::Kind(kind),
            Err(conflict) => Classification::Conflict(conflict),
        };
        &self.classification
    }

    /// The record's kind, or `None` when its discriminants conflict.
    pub fn kind(&self) -> Option<FlowKind> {
        match &self.classification {
            Classification::Kind(kind) => Some(*kind),
            Classification::Conflict(_) => None,
            Classification::Unclassified => FlowKind::classify(
                &self.name,
                self.is_dyna_flow.as_deref(),
                self.is_dyna_flow_task.as_deref(),
            )
            .ok(),
        }
    }

    pub fn conflict(&self) -> Option<&KindConflict> {
        match &self.classification {
            Classification::Conflict(conflict) => Some(conflict),
            _ => None,
        }
    }

    pub fn children(&self, kind: ChildKind) -> Option<&Vec<Item>> {
        match kind {
            ChildKind::Param => Some(&self.object_workflow_param),
            ChildKind::OutputVar => Some(&self.object_workflow_output_var),
            ChildKind::Button => Some(&self.object_workflow_button),
            ChildKind::Task => Some(&self.dyna_flow_task),
            ChildKind::Column => None,
        }
    }

    pub fn children_mut(&mut self, kind: ChildKind) -> Option<&mut Vec<Item>> {
        match kind {
            ChildKind::Param => Some(&mut self.object_workflow_param),
            ChildKind::OutputVar => Some(&mut self.object_workflow_output_var),
            ChildKind::Button => Some(&mut self.object_workflow_button),
            ChildKind::Task => Some(&mut self.dyna_flow_task),
            ChildKind::Column => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStory {
    #[serde(
        rename = "storyNumber",
        default,
        deserialize_with = "de_opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub story_number: Option<String>,
    #[serde(rename = "storyText", default)]
    pub story_text: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

fn de_opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "storyNumber must be a string or number, found {other}"
        ))),
    }
}

impl DataObject {
    /// Classify every flow record, returning the conflicts found.
    pub fn classify_flows(&mut self) -> Vec<KindConflict> {
        self.object_workflow
            .iter_mut()
            .filter_map(|flow| match flow.classify() {
                Classification::Conflict(conflict) => Some(conflict.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Document {
    /// Parse a document and classify its flows.
    pub fn from_value(value: Value) -> Result<Self, ModelError> {
        let mut doc: Document = serde_json::from_value(value)?;
        doc.classify();
        Ok(doc)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ModelError> {
        let mut doc: Document = serde_json::from_str(text)?;
        doc.classify();
        Ok(doc)
    }

    /// Classify every flow record in the document.
    pub fn classify(&mut self) -> Vec<KindConflict> {
        self.root
            .namespace
            .iter_mut()
            .flat_map(|ns| ns.object.iter_mut())
            .flat_map(DataObject::classify_flows)
            .collect()
    }

    /// All data objects across namespaces, in document order.
    pub fn data_objects(&self) -> impl Iterator<Item = &DataObject> {
        self.root.namespace.iter().flat_map(|ns| ns.object.iter())
    }

    /// Data object at a position of [`Document::data_objects`].
    pub fn data_object_at_mut(&mut self, index: usize) -> Option<&mut DataObject> {
        self.root
            .namespace
            .iter_mut()
            .flat_map(|ns| ns.object.iter_mut())
            .nth(index)
    }

    pub fn user_stories(&self) -> impl Iterator<Item = &UserStory> {
        self.root.namespace.iter().flat_map(|ns| ns.user_story.iter())
    }

    pub fn user_story_at_mut(&mut self, index: usize) -> Option<&mut UserStory> {
        self.root
            .namespace
            .iter_mut()
            .flat_map(|ns| ns.user_story.iter_mut())
            .nth(index)
    }

    /// Append a data object to the first namespace.
    pub fn push_data_object(&mut self, object: DataObject) -> Result<(), ModelError> {
        let ns = self
            .root
            .namespace
            .first_mut()
            .ok_or(ModelError::NoNamespace)?;
        ns.object.push(object);
        Ok(())
    }

    /// Append a user story to the first namespace.
    pub fn push_user_story(&mut self, story: UserStory) -> Result<(), ModelError> {
        let ns = self
            .root
            .namespace
            .first_mut()
            .ok_or(ModelError::NoNamespace)?;
        ns.user_story.push(story);
        Ok(())
    }
}

/// Overlay `updates` onto a record through its JSON form.
///
/// Keys present in `updates` replace the record's values wholesale; the record
/// is re-parsed so typed fields stay consistent with the attribute map.
pub fn merge_into<T>(target: &mut T, updates: &Map<String, Value>) -> Result<(), serde_json::Error>
where
    T: Serialize + DeserializeOwned,
{
    let mut value = serde_json::to_value(&*target)?;
    if let Value::Object(map) = &mut value {
        for (key, update) in updates {
            map.insert(key.clone(), update.clone());
        }
    }
    *target = serde_json::from_value(value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "root": {
                "name": "Shop",
                "namespace": [{
                    "name": "Main",
                    "object": [{
                        "name": "Customer",
                        "prop": [{"name": "Email", "sqlServerDBDataType": "nvarchar"}],
                        "report": [{
                            "name": "CustomerList",
                            "visualizationType": "Grid",
                            "reportColumn": [{"name": "Email", "headerText": "Email"}]
                        }],
                        "objectWorkflow": [
                            {"name": "CustomerAdd"},
                            {"name": "CustomerListInitReport"},
                            {"name": "ApproveCustomer", "isDynaFlow": "true"},
                            {"name": "BadInitObjWF", "isDynaFlow": "true"}
                        ]
                    }],
                    "userStory": [{"storyNumber": 7, "storyText": "As a user..."}]
                }]
            }
        })
    }

    #[test]
    fn test_load_classifies_flows() {
        let doc = Document::from_value(sample()).unwrap();
        let customer = doc.data_objects().next().unwrap();
        let kinds: Vec<_> = customer.object_workflow.iter().map(|f| f.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                Some(FlowKind::GeneralFlow),
                Some(FlowKind::PageInitFlow),
                Some(FlowKind::Workflow),
                None,
            ]
        );
        assert!(customer.object_workflow[3].conflict().is_some());
    }

    #[test]
    fn test_unknown_attributes_survive_round_trip() {
        let original = sample();
        let doc = Document::from_value(original.clone()).unwrap();
        let back = serde_json::to_value(&doc).unwrap();
        // storyNumber is normalised to a string, everything else is preserved.
        let mut expected = original;
        expected["root"]["namespace"][0]["userStory"][0]["storyNumber"] = json!("7");
        assert_eq!(back, expected);
    }

    #[test]
    fn test_merge_into_overlays_fields() {
        let mut report = Report {
            name: "CustomerList".into(),
            ..Default::default()
        };
        let updates = json!({"titleText": "Customers", "name": "CustomerGrid"});
        merge_into(&mut report, updates.as_object().unwrap()).unwrap();
        assert_eq!(report.name, "CustomerGrid");
        assert_eq!(report.attributes["titleText"], json!("Customers"));
    }

    #[test]
    fn test_push_requires_namespace() {
        let mut doc = Document::default();
        let err = doc.push_data_object(DataObject::default()).unwrap_err();
        assert!(matches!(err, ModelError::NoNamespace));
    }
}
