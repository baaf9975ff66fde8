//! Data object tools.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use appmodel_types::{Family, Plane};

use super::{check, fetch_snapshot, object, parse, post_action, text, to_value};
use crate::bridge::{Bridge, BridgeRequest};
use crate::catalog::FamilyCatalog;
use crate::config::TimeoutClass;
use crate::engine::{names_match, EntityLocator, PropertyProjector, UpdateMode, Violation};
use crate::error::ToolError;

/// Collections that belong to other families' tools.
const OWNED_COLLECTIONS: [(&str, &str); 2] = [
    ("report", "report tools"),
    ("objectWorkflow", "workflow, general flow and page init flow tools"),
];

pub struct DataObjectFacade {
    bridge: Arc<dyn Bridge>,
    catalog: Arc<FamilyCatalog>,
}

impl DataObjectFacade {
    pub(crate) fn new(bridge: Arc<dyn Bridge>, catalog: Arc<FamilyCatalog>) -> Self {
        Self { bridge, catalog }
    }

    pub fn catalog(&self) -> &FamilyCatalog {
        &self.catalog
    }

    fn projector(&self) -> PropertyProjector<'_> {
        PropertyProjector::new(&self.catalog.projection)
    }

    /// Summaries of every data object, optionally filtered by name.
    pub async fn list(&self, name: Option<&str>) -> Result<Value, ToolError> {
        let request = BridgeRequest::get(
            Plane::Data,
            format!("/api/{}", Family::DataObject.collection_slug()),
            TimeoutClass::Fetch,
        )
        .with_query(Family::DataObject.name_key(), name);
        let objects: Vec<Value> = parse(self.bridge.exchange(request).await?, "data objects")?;

        let count_of = |object: &Value, field: &str| {
            object
                .get(field)
                .and_then(Value::as_array)
                .map_or(0, Vec::len)
        };
        let summaries: Vec<Value> = objects
            .iter()
            .map(|o| {
                json!({
                    "name": o.get("name"),
                    "parentObjectName": o.get("parentObjectName"),
                    "prop_count": count_of(o, "prop"),
                    "report_count": count_of(o, "report"),
                    "flow_count": count_of(o, "objectWorkflow"),
                })
            })
            .collect();
        Ok(json!({
            "success": true,
            "count": summaries.len(),
            "data_objects": summaries,
        }))
    }

    pub async fn get(&self, name: &str) -> Result<Value, ToolError> {
        let objects = fetch_snapshot(&*self.bridge).await?;
        let locator = EntityLocator::new(&objects);
        let found = locator.find_data_object(name)?;
        let value = to_value(found.entity, "data object")?;
        Ok(json!({
            "success": true,
            "data_object": self.projector().to_public(&value),
        }))
    }

    #[tracing::instrument(skip(self, payload))]
    pub async fn add(&self, payload: &Map<String, Value>) -> Result<Value, ToolError> {
        let record = self.projector().to_canonical(payload);
        reject_owned_collections(&record)?;
        check(&self.catalog.validator, self.projector(), &record, UpdateMode::Full)?;
        let name = text(&record, "name").unwrap_or_default().to_string();

        let objects = fetch_snapshot(&*self.bridge).await?;
        let locator = EntityLocator::new(&objects);
        locator.ensure_unique(Family::DataObject, &name)?;
        if let Some(parent) = text(&record, "parentObjectName") {
            locator.find_data_object(parent)?;
        }

        let sent = Value::Object(record);
        let ack = post_action(
            &*self.bridge,
            "add-data-object",
            object([(Family::DataObject.key(), sent.clone())]),
        )
        .await?;
        let entity = ack.entity(Family::DataObject.key()).cloned().unwrap_or(sent);
        Ok(json!({
            "success": true,
            "data_object": self.projector().to_public(&entity),
        }))
    }

    #[tracing::instrument(skip(self, updates))]
    pub async fn update(&self, name: &str, updates: &Map<String, Value>) -> Result<Value, ToolError> {
        let updates = self.projector().to_canonical(updates);
        reject_owned_collections(&updates)?;
        check(&self.catalog.validator, self.projector(), &updates, UpdateMode::Partial)?;

        let objects = fetch_snapshot(&*self.bridge).await?;
        let locator = EntityLocator::new(&objects);
        let found = locator.find_data_object(name)?;
        if let Some(new_name) = text(&updates, "name") {
            if !names_match(new_name, &found.entity.name) {
                locator.ensure_unique(Family::DataObject, new_name)?;
            }
        }
        if let Some(parent) = text(&updates, "parentObjectName") {
            if names_match(parent, &found.entity.name) {
                return Err(ToolError::ValidationFailed(vec![Violation::new(
                    "parentObjectName",
                    "a data object cannot be its own parent",
                )]));
            }
            locator.find_data_object(parent)?;
        }

        let body = object([
            (Family::DataObject.name_key(), json!(found.entity.name)),
            ("updates", Value::Object(updates)),
        ]);
        let ack = post_action(&*self.bridge, "update-data-object", body).await?;
        let entity = match ack.entity(Family::DataObject.key()) {
            Some(entity) => entity.clone(),
            None => to_value(found.entity, "data object")?,
        };
        Ok(json!({
            "success": true,
            "data_object": self.projector().to_public(&entity),
        }))
    }
}

fn reject_owned_collections(record: &Map<String, Value>) -> Result<(), ToolError> {
    let violations: Vec<Violation> = OWNED_COLLECTIONS
        .iter()
        .filter(|(field, _)| record.contains_key(*field))
        .map(|(field, tools)| Violation::new(*field, format!("must be changed through the {tools}")))
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ToolError::ValidationFailed(violations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalogs;
    use crate::facade::testing::ScriptedBridge;

    fn facade(answers: Vec<Result<Value, crate::BridgeError>>) -> (DataObjectFacade, Arc<ScriptedBridge>) {
        let bridge = Arc::new(ScriptedBridge::new(answers));
        let catalog = Catalogs::builtin()
            .unwrap()
            .family(Family::DataObject)
            .unwrap();
        (DataObjectFacade::new(bridge.clone(), catalog), bridge)
    }

    fn snapshot() -> Value {
        json!([
            {"name": "Tac", "prop": [{"name": "Id"}]},
            {"name": "Customer", "parentObjectName": "Tac", "report": [{"name": "CustomerList"}]}
        ])
    }

    #[tokio::test]
    async fn test_list_summarises() {
        let (objects, _) = facade(vec![Ok(snapshot())]);
        let result = objects.list(None).await.unwrap();
        assert_eq!(result["count"], json!(2));
        assert_eq!(result["data_objects"][0]["prop_count"], json!(1));
        assert_eq!(result["data_objects"][1]["report_count"], json!(1));
    }

    #[tokio::test]
    async fn test_add_requires_known_parent() {
        let (objects, bridge) = facade(vec![Ok(snapshot())]);
        let err = objects
            .add(
                json!({"name": "Order", "parentObjectName": "Invoice"})
                    .as_object()
                    .unwrap(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(bridge.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_add_maps_property_aliases() {
        let ack = json!({"success": true});
        let (objects, bridge) = facade(vec![Ok(snapshot()), Ok(ack)]);
        let result = objects
            .add(
                json!({
                    "name": "Order",
                    "parentObjectName": "customer",
                    "prop": [{"name": "Total", "dataType": "money"}]
                })
                .as_object()
                .unwrap(),
            )
            .await
            .unwrap();
        let body = bridge.requests()[1].body.clone().unwrap();
        assert_eq!(
            body["data_object"]["prop"][0]["sqlServerDBDataType"],
            json!("money")
        );
        assert_eq!(result["data_object"]["prop"][0]["dataType"], json!("money"));
    }

    #[tokio::test]
    async fn test_update_cannot_touch_reports() {
        let (objects, bridge) = facade(vec![]);
        let err = objects
            .update("Customer", json!({"report": []}).as_object().unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
        assert!(bridge.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_rename_collides_case_insensitively() {
        let (objects, _) = facade(vec![Ok(snapshot())]);
        let err = objects
            .update("Customer", json!({"name": "TAC"}).as_object().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::DuplicateName(_)));
    }
}
