//! Facade for families owned by a data object: reports, workflows, general
//! flows and page init flows, together with their nested collections.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use appmodel_types::{
    ChildKind, Family, FlowKind, FlowRecord, HostAck, Item, LocatedRecord, Plane, Report,
};

use super::{check, fetch_snapshot, object, parse, post_action, text, to_value};
use crate::bridge::{Bridge, BridgeRequest};
use crate::catalog::{ChildCatalog, FamilyCatalog};
use crate::config::TimeoutClass;
use crate::engine::locator::{ensure_unique_child, require_child};
use crate::engine::{
    move_named, names_match, EntityLocator, LocateError, Located, PropertyProjector, UpdateMode,
    Violation,
};
use crate::error::ToolError;

/// An entity that owns nested collections.
enum Parent<'a> {
    Report(Located<'a, Report>),
    Flow(Located<'a, FlowRecord>),
}

impl<'a> Parent<'a> {
    fn owner(&self) -> &'a str {
        match self {
            Parent::Report(found) => found.owner_object_name,
            Parent::Flow(found) => found.owner_object_name,
        }
    }

    fn name(&self) -> &'a str {
        match self {
            Parent::Report(found) => &found.entity.name,
            Parent::Flow(found) => &found.entity.name,
        }
    }

    fn children(&self, kind: ChildKind) -> Option<&'a [Item]> {
        match self {
            Parent::Report(found) => found.entity.children(kind).map(Vec::as_slice),
            Parent::Flow(found) => found.entity.children(kind).map(Vec::as_slice),
        }
    }

    fn to_value(&self) -> Result<Value, ToolError> {
        match self {
            Parent::Report(found) => to_value(found.entity, "report"),
            Parent::Flow(found) => to_value(found.entity, "flow"),
        }
    }
}

pub struct OwnedFacade {
    family: Family,
    bridge: Arc<dyn Bridge>,
    catalog: Arc<FamilyCatalog>,
}

impl OwnedFacade {
    pub(crate) fn new(family: Family, bridge: Arc<dyn Bridge>, catalog: Arc<FamilyCatalog>) -> Self {
        debug_assert!(family.is_owned(), "{family} is not owned by a data object");
        Self {
            family,
            bridge,
            catalog,
        }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn catalog(&self) -> &FamilyCatalog {
        &self.catalog
    }

    fn projector(&self) -> PropertyProjector<'_> {
        PropertyProjector::new(&self.catalog.projection)
    }

    fn child_catalog(&self, kind: ChildKind) -> Result<&ChildCatalog, ToolError> {
        self.catalog.child(kind).ok_or_else(|| {
            ToolError::ValidationFailed(vec![Violation::new(
                kind.key(),
                format!("a {} has no {} collection", self.family, kind),
            )])
        })
    }

    fn locate<'a>(
        &self,
        locator: &EntityLocator<'a>,
        name: &str,
        owner: Option<&str>,
    ) -> Result<Parent<'a>, LocateError> {
        match self.family.flow_kind() {
            Some(kind) => locator.find_flow(kind, name, owner).map(Parent::Flow),
            None => locator.find_report(name, owner).map(Parent::Report),
        }
    }

    /// Canonical record for a new or replacing entity, discriminant applied.
    fn prepare_record(&self, payload: &Map<String, Value>) -> Map<String, Value> {
        let mut record = self.projector().to_canonical(payload);
        if self.family == Family::Workflow {
            record.insert("isDynaFlow".into(), json!("true"));
        }
        record
    }

    /// Reject a record whose discriminants would classify it outside this family.
    fn check_kind(&self, name: &str, record: &Map<String, Value>) -> Result<(), ToolError> {
        let Some(expected) = self.family.flow_kind() else {
            return Ok(());
        };
        let reason = match FlowKind::classify(
            name,
            text(record, "isDynaFlow"),
            text(record, "isDynaFlowTask"),
        ) {
            Ok(actual) if actual == expected => return Ok(()),
            Ok(actual) => format!("'{name}' would be classified as a {actual}, not a {expected}"),
            Err(conflict) => conflict.to_string(),
        };
        Err(ToolError::ValidationFailed(vec![Violation::new("name", reason)]))
    }

    /// Classification of an existing flow after `updates` are applied.
    fn check_updated_kind(
        &self,
        flow: &FlowRecord,
        updates: &Map<String, Value>,
    ) -> Result<(), ToolError> {
        let mut merged = match to_value(flow, "flow")? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in updates {
            merged.insert(key.clone(), value.clone());
        }
        let name = text(&merged, "name").unwrap_or_default().to_string();
        self.check_kind(&name, &merged)
    }

    fn entity_result(
        &self,
        ack: &HostAck,
        key: &str,
        sent: Value,
        projector: PropertyProjector<'_>,
        owner: &str,
    ) -> Value {
        let entity = ack.entity(key).cloned().unwrap_or(sent);
        let mut result = Map::new();
        result.insert("success".into(), json!(true));
        result.insert(key.into(), projector.to_public(&entity));
        result.insert(
            "owner_object_name".into(),
            json!(ack.owner_object_name.as_deref().unwrap_or(owner)),
        );
        Value::Object(result)
    }

    /// List entities, optionally filtered by owner and name (case-insensitive).
    pub async fn list(&self, owner: Option<&str>, name: Option<&str>) -> Result<Value, ToolError> {
        let request = BridgeRequest::get(
            Plane::Data,
            format!("/api/{}", self.family.collection_slug()),
            TimeoutClass::Fetch,
        )
        .with_query("owner_object_name", owner)
        .with_query(self.family.name_key(), name);
        let records: Vec<LocatedRecord> = parse(
            self.bridge.exchange(request).await?,
            self.family.collection_slug(),
        )?;

        let projector = self.projector();
        let collection_key = self.family.collection_slug().replace('-', "_");
        let items: Vec<Value> = records
            .iter()
            .map(|record| {
                object([
                    ("owner_object_name", json!(record.owner_object_name)),
                    (self.family.key(), projector.to_public(&record.entity)),
                ])
            })
            .collect();
        Ok(object([
            ("success", json!(true)),
            ("count", json!(items.len())),
            (collection_key.as_str(), Value::Array(items)),
        ]))
    }

    /// One entity by name; without an owner the first match in document order wins.
    pub async fn get(&self, name: &str, owner: Option<&str>) -> Result<Value, ToolError> {
        let objects = fetch_snapshot(&*self.bridge).await?;
        let locator = EntityLocator::new(&objects);
        let found = self.locate(&locator, name, owner)?;
        Ok(object([
            ("success", json!(true)),
            (self.family.key(), self.projector().to_public(&found.to_value()?)),
            ("owner_object_name", json!(found.owner())),
        ]))
    }

    #[tracing::instrument(skip(self, payload), fields(family = %self.family))]
    pub async fn add(&self, owner: &str, payload: &Map<String, Value>) -> Result<Value, ToolError> {
        let record = self.prepare_record(payload);
        check(&self.catalog.validator, self.projector(), &record, UpdateMode::Full)?;
        let name = text(&record, "name").unwrap_or_default().to_string();
        self.check_kind(&name, &record)?;

        let objects = fetch_snapshot(&*self.bridge).await?;
        let locator = EntityLocator::new(&objects);
        let owner = locator.find_data_object(owner)?.owner_object_name.to_string();
        locator.ensure_unique(self.family, &name)?;

        let sent = Value::Object(record);
        let body = object([
            ("owner_object_name", json!(owner)),
            (self.family.key(), sent.clone()),
        ]);
        let ack = post_action(&*self.bridge, &format!("add-{}", self.family.slug()), body).await?;
        Ok(self.entity_result(&ack, self.family.key(), sent, self.projector(), &owner))
    }

    /// Apply a partial update; only the fields present are validated.
    #[tracing::instrument(skip(self, updates), fields(family = %self.family))]
    pub async fn update(
        &self,
        name: &str,
        owner: Option<&str>,
        updates: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let updates = self.projector().to_canonical(updates);
        check(&self.catalog.validator, self.projector(), &updates, UpdateMode::Partial)?;

        let objects = fetch_snapshot(&*self.bridge).await?;
        let locator = EntityLocator::new(&objects);
        let found = self.locate(&locator, name, owner)?;
        if let Some(new_name) = text(&updates, "name") {
            if !names_match(new_name, found.name()) {
                locator.ensure_unique(self.family, new_name)?;
            }
        }
        if let Parent::Flow(flow) = &found {
            self.check_updated_kind(flow.entity, &updates)?;
        }

        let body = object([
            (self.family.name_key(), json!(found.name())),
            ("owner_object_name", json!(found.owner())),
            ("updates", Value::Object(updates)),
        ]);
        let ack =
            post_action(&*self.bridge, &format!("update-{}", self.family.slug()), body).await?;
        let sent = found.to_value()?;
        Ok(self.entity_result(&ack, self.family.key(), sent, self.projector(), found.owner()))
    }

    /// Replace an entity wholesale; the complete schema applies.
    #[tracing::instrument(skip(self, entity), fields(family = %self.family))]
    pub async fn replace(
        &self,
        name: &str,
        owner: Option<&str>,
        entity: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let record = self.prepare_record(entity);
        check(&self.catalog.validator, self.projector(), &record, UpdateMode::Full)?;
        let new_name = text(&record, "name").unwrap_or_default().to_string();
        self.check_kind(&new_name, &record)?;

        let objects = fetch_snapshot(&*self.bridge).await?;
        let locator = EntityLocator::new(&objects);
        let found = self.locate(&locator, name, owner)?;
        if !names_match(&new_name, found.name()) {
            locator.ensure_unique(self.family, &new_name)?;
        }

        let sent = Value::Object(record);
        let body = object([
            (self.family.name_key(), json!(found.name())),
            ("owner_object_name", json!(found.owner())),
            (self.family.key(), sent.clone()),
        ]);
        let ack =
            post_action(&*self.bridge, &format!("replace-{}", self.family.slug()), body).await?;
        Ok(self.entity_result(&ack, self.family.key(), sent, self.projector(), found.owner()))
    }

    /// Append an item to one of the entity's nested collections.
    #[tracing::instrument(skip(self, kind, item), fields(family = %self.family, kind = %kind))]
    pub async fn add_child(
        &self,
        kind: ChildKind,
        parent: &str,
        owner: Option<&str>,
        item: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let child = self.child_catalog(kind)?;
        let projector = PropertyProjector::new(&child.projection);
        let mut record = projector.to_canonical(item);
        if kind == ChildKind::Task {
            record.insert("isDynaFlowTask".into(), json!("true"));
        }
        check(&child.validator, projector, &record, UpdateMode::Full)?;
        let item_name = text(&record, kind.key_field()).unwrap_or_default().to_string();

        let objects = fetch_snapshot(&*self.bridge).await?;
        let locator = EntityLocator::new(&objects);
        let found = self.locate(&locator, parent, owner)?;
        let items = found.children(kind).unwrap_or_default();
        ensure_unique_child(items, kind, &item_name, found.name())?;

        let sent = Value::Object(record);
        let body = object([
            (self.family.name_key(), json!(found.name())),
            ("owner_object_name", json!(found.owner())),
            (kind.key(), sent.clone()),
        ]);
        let action = format!("add-{}-{}", self.family.slug(), kind.slug());
        let ack = post_action(&*self.bridge, &action, body).await?;

        let mut result = self.entity_result(&ack, kind.key(), sent, projector, found.owner());
        result[self.family.name_key()] = json!(found.name());
        Ok(result)
    }

    /// Partially update one nested item, found by name (case-insensitive).
    #[tracing::instrument(skip(self, kind, updates), fields(family = %self.family, kind = %kind))]
    pub async fn update_child(
        &self,
        kind: ChildKind,
        parent: &str,
        owner: Option<&str>,
        item_name: &str,
        updates: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let child = self.child_catalog(kind)?;
        let projector = PropertyProjector::new(&child.projection);
        let updates = projector.to_canonical(updates);
        check(&child.validator, projector, &updates, UpdateMode::Partial)?;

        let objects = fetch_snapshot(&*self.bridge).await?;
        let locator = EntityLocator::new(&objects);
        let found = self.locate(&locator, parent, owner)?;
        let items = found.children(kind).unwrap_or_default();
        let (_, existing) = require_child(items, kind, item_name, found.name())?;
        let existing_name = existing.text(kind.key_field()).unwrap_or(item_name).to_string();
        if let Some(new_name) = text(&updates, kind.key_field()) {
            if !names_match(new_name, &existing_name) {
                ensure_unique_child(items, kind, new_name, found.name())?;
            }
        }

        let body = object([
            (self.family.name_key(), json!(found.name())),
            ("owner_object_name", json!(found.owner())),
            (kind.name_key(), json!(existing_name)),
            ("updates", Value::Object(updates)),
        ]);
        let action = format!("update-{}-{}", self.family.slug(), kind.slug());
        let ack = post_action(&*self.bridge, &action, body).await?;

        let sent = to_value(existing, kind.key())?;
        let mut result = self.entity_result(&ack, kind.key(), sent, projector, found.owner());
        result[self.family.name_key()] = json!(found.name());
        Ok(result)
    }

    /// Move a nested item to `new_index` (exact, case-sensitive name match).
    ///
    /// The move is checked against the snapshot before it is sent, so an
    /// invalid index or unknown name never reaches the host.
    #[tracing::instrument(skip(self, kind), fields(family = %self.family, kind = %kind))]
    pub async fn move_child(
        &self,
        kind: ChildKind,
        parent: &str,
        owner: Option<&str>,
        item_name: &str,
        new_index: i64,
    ) -> Result<Value, ToolError> {
        self.child_catalog(kind)?;

        let objects = fetch_snapshot(&*self.bridge).await?;
        let locator = EntityLocator::new(&objects);
        let found = self.locate(&locator, parent, owner)?;
        let mut preview = found.children(kind).unwrap_or_default().to_vec();
        let outcome = move_named(&mut preview, item_name, new_index, |item: &Item| {
            item.text(kind.key_field())
        })?;

        let body = object([
            (self.family.name_key(), json!(found.name())),
            ("owner_object_name", json!(found.owner())),
            (kind.name_key(), json!(item_name)),
            ("new_position", json!(new_index)),
        ]);
        let action = format!("move-{}-{}", self.family.slug(), kind.slug());
        let ack = post_action(&*self.bridge, &action, body).await?;

        Ok(object([
            ("success", json!(true)),
            (self.family.name_key(), json!(found.name())),
            (kind.name_key(), json!(item_name)),
            (
                "owner_object_name",
                json!(ack.owner_object_name.as_deref().unwrap_or(found.owner())),
            ),
            (
                "old_position",
                json!(ack.old_position.unwrap_or(outcome.old_index)),
            ),
            (
                "new_position",
                json!(ack.new_position.unwrap_or(outcome.new_index)),
            ),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalogs;
    use crate::error::BridgeError;
    use crate::facade::testing::ScriptedBridge;
    use crate::facade::SNAPSHOT_PATH;
    use crate::Method;
    use pretty_assertions::assert_eq;

    fn snapshot() -> Value {
        json!([
            {
                "name": "Customer",
                "parentObjectName": "Tac",
                "report": [{
                    "name": "customerlist",
                    "modificationDate": "2024-01-01",
                    "reportColumn": [
                        {"name": "A", "sqlServerDBDataType": "nvarchar"},
                        {"name": "B"}, {"name": "C"}, {"name": "D"}
                    ]
                }],
                "objectWorkflow": [
                    {"name": "CustomerAdd"},
                    {"name": "ApproveCustomer", "isDynaFlow": "true"}
                ]
            },
            {
                "name": "Order",
                "parentObjectName": "Customer",
                "report": [{"name": "CustomerList"}]
            }
        ])
    }

    fn facade(
        family: Family,
        answers: Vec<Result<Value, BridgeError>>,
    ) -> (OwnedFacade, Arc<ScriptedBridge>) {
        let bridge = Arc::new(ScriptedBridge::new(answers));
        let catalogs = Catalogs::builtin().unwrap();
        let facade = OwnedFacade::new(
            family,
            bridge.clone(),
            catalogs.family(family).unwrap(),
        );
        (facade, bridge)
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_get_first_match_with_true_owner() {
        let (reports, bridge) = facade(Family::Report, vec![Ok(snapshot())]);
        let result = reports.get("CustomerList", None).await.unwrap();
        assert_eq!(result["owner_object_name"], json!("Customer"));
        assert_eq!(result["report"]["name"], json!("customerlist"));
        // Hidden fields never leave the facade; aliases are applied to children.
        assert!(result["report"].get("modificationDate").is_none());
        assert_eq!(
            result["report"]["reportColumn"][0]["dataType"],
            json!("nvarchar")
        );
        assert_eq!(bridge.requests()[0].path, SNAPSHOT_PATH);
    }

    #[tokio::test]
    async fn test_get_wrong_kind_is_not_found() {
        let (workflows, _) = facade(Family::Workflow, vec![Ok(snapshot())]);
        let err = workflows.get("CustomerAdd", None).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        assert!(err.to_string().contains("general flow"));
    }

    #[tokio::test]
    async fn test_add_rejects_global_duplicate() {
        let (reports, bridge) = facade(Family::Report, vec![Ok(snapshot())]);
        let err = reports
            .add("Order", &args(json!({"name": "CUSTOMERLIST"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::DuplicateName(_)));
        assert!(err.to_string().contains("'Customer'"));
        // Only the snapshot lookup was made.
        assert_eq!(bridge.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_add_validates_before_any_exchange() {
        let (reports, bridge) = facade(Family::Report, vec![]);
        let err = reports
            .add(
                "Customer",
                &args(json!({"name": "orderList", "visualizationType": "Pie"})),
            )
            .await
            .unwrap_err();
        match err {
            ToolError::ValidationFailed(violations) => {
                let mut fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
                fields.sort();
                assert_eq!(fields, vec!["name", "visualizationType"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(bridge.requests().is_empty());
    }

    #[tokio::test]
    async fn test_add_workflow_sets_discriminant() {
        let ack = json!({
            "success": true,
            "owner_object_name": "Order",
            "workflow": {"name": "ShipOrder", "isDynaFlow": "true", "isCustomLogicOverwritten": "false"}
        });
        let (workflows, bridge) = facade(Family::Workflow, vec![Ok(snapshot()), Ok(ack)]);
        let result = workflows
            .add("order", &args(json!({"name": "ShipOrder"})))
            .await
            .unwrap();
        assert_eq!(result["workflow"]["isDynaFlow"], json!("true"));
        assert!(result["workflow"].get("isCustomLogicOverwritten").is_none());

        let requests = bridge.requests();
        assert_eq!(requests[1].method, Method::Post);
        assert_eq!(requests[1].path, "/api/add-workflow");
        let body = requests[1].body.clone().unwrap();
        assert_eq!(body["owner_object_name"], json!("Order"));
        assert_eq!(body["workflow"]["isDynaFlow"], json!("true"));
    }

    #[tokio::test]
    async fn test_add_general_flow_with_page_init_suffix_rejected() {
        let (flows, bridge) = facade(Family::GeneralFlow, vec![]);
        let err = flows
            .add("Customer", &args(json!({"name": "CustomerInitReport"})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
        assert!(err.to_string().contains("page init flow"));
        assert!(bridge.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_partial_empty_rejected() {
        let (reports, _) = facade(Family::Report, vec![]);
        let err = reports
            .update("CustomerList", None, &Map::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: updates: at least one property must be provided"
        );
    }

    #[tokio::test]
    async fn test_update_maps_aliases_and_sends_true_name() {
        let ack = json!({"success": true, "owner_object_name": "Customer"});
        let (reports, bridge) = facade(Family::Report, vec![Ok(snapshot()), Ok(ack)]);
        reports
            .update_child(
                ChildKind::Column,
                "CUSTOMERLIST",
                Some("customer"),
                "b",
                &args(json!({"dataType": "int"})),
            )
            .await
            .unwrap();
        let body = bridge.requests()[1].body.clone().unwrap();
        assert_eq!(
            body,
            json!({
                "report_name": "customerlist",
                "owner_object_name": "Customer",
                "column_name": "B",
                "updates": {"sqlServerDBDataType": "int"}
            })
        );
    }

    #[tokio::test]
    async fn test_child_violations_use_public_names() {
        let (reports, bridge) = facade(Family::Report, vec![]);
        let err = reports
            .add_child(
                ChildKind::Column,
                "CustomerList",
                None,
                &args(json!({"name": "Age", "dataType": "bogus"})),
            )
            .await
            .unwrap_err();
        match err {
            ToolError::ValidationFailed(violations) => {
                assert_eq!(violations.len(), 1);
                assert!(
                    violations[0].to_string().starts_with("dataType: must be one of"),
                    "{}",
                    violations[0]
                );
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(bridge.requests().is_empty());
    }

    #[tokio::test]
    async fn test_add_child_duplicate_is_local() {
        let (reports, _) = facade(Family::Report, vec![Ok(snapshot())]);
        let err = reports
            .add_child(
                ChildKind::Column,
                "CustomerList",
                Some("Customer"),
                &args(json!({"name": "C"})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::DuplicateName(_)));

        // The same column name is free under a different report.
        let ack = json!({"success": true, "owner_object_name": "Order", "column": {"name": "C"}});
        let (reports, _) = facade(Family::Report, vec![Ok(snapshot()), Ok(ack)]);
        let result = reports
            .add_child(
                ChildKind::Column,
                "CustomerList",
                Some("Order"),
                &args(json!({"name": "C"})),
            )
            .await
            .unwrap();
        assert_eq!(result["report_name"], json!("CustomerList"));
    }

    #[tokio::test]
    async fn test_move_child_prechecks_and_reports_positions() {
        let ack = json!({
            "success": true,
            "owner_object_name": "Customer",
            "old_position": 1,
            "new_position": 3
        });
        let (reports, bridge) = facade(Family::Report, vec![Ok(snapshot()), Ok(ack)]);
        let result = reports
            .move_child(ChildKind::Column, "CustomerList", None, "B", 3)
            .await
            .unwrap();
        assert_eq!(result["old_position"], json!(1));
        assert_eq!(result["new_position"], json!(3));
        let body = bridge.requests()[1].body.clone().unwrap();
        assert_eq!(body["new_position"], json!(3));
    }

    #[tokio::test]
    async fn test_move_child_invalid_position_never_sent() {
        let (reports, bridge) = facade(Family::Report, vec![Ok(snapshot())]);
        let err = reports
            .move_child(ChildKind::Column, "CustomerList", None, "B", 4)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_POSITION");

        let (reports, _) = facade(Family::Report, vec![Ok(snapshot())]);
        let err = reports
            .move_child(ChildKind::Column, "CustomerList", None, "b", 0)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(bridge.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_child_kind() {
        let (reports, bridge) = facade(Family::Report, vec![]);
        let err = reports
            .add_child(ChildKind::Task, "CustomerList", None, &Map::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
        assert!(bridge.requests().is_empty());
    }

    #[tokio::test]
    async fn test_bridge_down_is_unavailable() {
        let refused = BridgeError::ConnectionRefused {
            plane: Plane::Data,
            url: "http://127.0.0.1:3001/api/reports".into(),
            reason: "connection refused".into(),
        };
        let (reports, _) = facade(Family::Report, vec![Err(refused)]);
        let err = reports.list(None, None).await.unwrap_err();
        assert_eq!(err.code(), "BRIDGE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_list_projects_each_record() {
        let listing = json!([
            {"owner_object_name": "Customer", "entity": {"name": "CustomerList", "isCachingAllowed": "true"}}
        ]);
        let (reports, bridge) = facade(Family::Report, vec![Ok(listing)]);
        let result = reports.list(Some("customer"), None).await.unwrap();
        assert_eq!(result["count"], json!(1));
        assert_eq!(
            result["reports"][0],
            json!({"owner_object_name": "Customer", "report": {"name": "CustomerList"}})
        );
        assert_eq!(
            bridge.requests()[0].query,
            vec![("owner_object_name".to_string(), "customer".to_string())]
        );
    }
}
