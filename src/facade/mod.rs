//! Tool facades.
//!
//! A facade turns one tool request into at most two bridge exchanges: a
//! snapshot lookup (when the request names an existing entity or must be
//! checked for duplicates) followed by a single mutation. Payloads are mapped
//! to canonical field names and validated before anything is sent, and every
//! entity returned to the caller is projected back to its public shape.

pub mod commands;
pub mod data_object;
pub mod owned;
pub mod user_story;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use appmodel_types::{DataObject, Family, HostAck, Plane};

use crate::bridge::{AuthGate, Bridge, BridgeRequest};
use crate::catalog::{CatalogError, Catalogs, FamilyCatalog};
use crate::config::TimeoutClass;
use crate::engine::{PropertyProjector, UpdateMode, UpdateValidator, Violation};
use crate::error::ToolError;

pub use commands::{CommandFacade, ViewCommand};
pub use data_object::DataObjectFacade;
pub use owned::OwnedFacade;
pub use user_story::UserStoryFacade;

/// Every facade, sharing one bridge.
pub struct Toolbox {
    pub data_objects: DataObjectFacade,
    pub reports: OwnedFacade,
    pub workflows: OwnedFacade,
    pub general_flows: OwnedFacade,
    pub page_init_flows: OwnedFacade,
    pub user_stories: UserStoryFacade,
    pub commands: CommandFacade,
}

impl Toolbox {
    pub fn new(bridge: Arc<dyn Bridge>, catalogs: &Catalogs) -> Result<Self, CatalogError> {
        let owned = |family| -> Result<OwnedFacade, CatalogError> {
            Ok(OwnedFacade::new(
                family,
                Arc::clone(&bridge),
                catalogs.family(family)?,
            ))
        };
        Ok(Self {
            data_objects: DataObjectFacade::new(
                Arc::clone(&bridge),
                catalogs.family(Family::DataObject)?,
            ),
            reports: owned(Family::Report)?,
            workflows: owned(Family::Workflow)?,
            general_flows: owned(Family::GeneralFlow)?,
            page_init_flows: owned(Family::PageInitFlow)?,
            user_stories: UserStoryFacade::new(
                Arc::clone(&bridge),
                catalogs.family(Family::UserStory)?,
            ),
            commands: CommandFacade::new(Arc::clone(&bridge), AuthGate::new(Arc::clone(&bridge))),
        })
    }

    /// Facade for a family owned by a data object (reports and the flow families).
    pub fn owned(&self, family: Family) -> Option<&OwnedFacade> {
        match family {
            Family::Report => Some(&self.reports),
            Family::Workflow => Some(&self.workflows),
            Family::GeneralFlow => Some(&self.general_flows),
            Family::PageInitFlow => Some(&self.page_init_flows),
            Family::DataObject | Family::UserStory => None,
        }
    }

    pub fn catalog(&self, family: Family) -> &FamilyCatalog {
        match family {
            Family::DataObject => self.data_objects.catalog(),
            Family::UserStory => self.user_stories.catalog(),
            Family::Report => self.reports.catalog(),
            Family::Workflow => self.workflows.catalog(),
            Family::GeneralFlow => self.general_flows.catalog(),
            Family::PageInitFlow => self.page_init_flows.catalog(),
        }
    }
}

pub(crate) const SNAPSHOT_PATH: &str = "/api/data-objects";

fn malformed(what: &str, err: serde_json::Error) -> ToolError {
    ToolError::MalformedResponse(format!("{what}: {err}"))
}

pub(crate) fn parse<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, ToolError> {
    serde_json::from_value(value).map_err(|e| malformed(what, e))
}

pub(crate) fn to_value<T: serde::Serialize>(record: &T, what: &str) -> Result<Value, ToolError> {
    serde_json::to_value(record).map_err(|e| malformed(what, e))
}

/// Fresh snapshot of every data object, with flows classified.
pub(crate) async fn fetch_snapshot(bridge: &dyn Bridge) -> Result<Vec<DataObject>, ToolError> {
    let body = bridge
        .exchange(BridgeRequest::get(Plane::Data, SNAPSHOT_PATH, TimeoutClass::Fetch))
        .await?;
    let mut objects: Vec<DataObject> = parse(body, "data object snapshot")?;
    for object in &mut objects {
        for conflict in object.classify_flows() {
            tracing::warn!(%conflict, owner = %object.name, "flow record matches more than one kind");
        }
    }
    Ok(objects)
}

/// POST one data-plane mutation and decode the host's acknowledgement.
pub(crate) async fn post_action(
    bridge: &dyn Bridge,
    action: &str,
    body: Value,
) -> Result<HostAck, ToolError> {
    let request = BridgeRequest::post(
        Plane::Data,
        format!("/api/{action}"),
        body,
        TimeoutClass::Mutation,
    );
    let ack: HostAck = parse(bridge.exchange(request).await?, action)?;
    tracing::info!(action, owner = ?ack.owner_object_name, "host accepted mutation");
    Ok(ack)
}

/// Reject a payload with any violations, reported under the caller's field names.
pub(crate) fn check(
    validator: &UpdateValidator,
    projector: PropertyProjector<'_>,
    payload: &Map<String, Value>,
    mode: UpdateMode,
) -> Result<(), ToolError> {
    let violations = validator.validate(&Value::Object(payload.clone()), mode);
    if violations.is_empty() {
        return Ok(());
    }
    tracing::debug!(count = violations.len(), ?mode, "payload rejected");
    Err(ToolError::ValidationFailed(
        violations
            .into_iter()
            .map(|v| Violation {
                field: projector.public_path(&v.field),
                ..v
            })
            .collect(),
    ))
}

/// String field of a validated payload.
pub(crate) fn text<'a>(record: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

/// JSON object from key/value pairs.
pub(crate) fn object<const N: usize>(pairs: [(&str, Value); N]) -> Value {
    Value::Object(
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory bridge for facade tests.

    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::bridge::{Bridge, BridgeRequest};
    use crate::error::BridgeError;

    /// Answers exchanges from a queue and records every request.
    #[derive(Default)]
    pub struct ScriptedBridge {
        answers: Mutex<Vec<Result<Value, BridgeError>>>,
        pub requests: Mutex<Vec<BridgeRequest>>,
    }

    impl ScriptedBridge {
        pub fn new(answers: Vec<Result<Value, BridgeError>>) -> Self {
            let mut answers = answers;
            answers.reverse();
            Self {
                answers: Mutex::new(answers),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> Vec<BridgeRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Bridge for ScriptedBridge {
        async fn exchange(&self, request: BridgeRequest) -> Result<Value, BridgeError> {
            self.requests.lock().unwrap().push(request);
            self.answers
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| panic!("unexpected extra exchange"))
        }
    }
}
