//! In-memory document store behind the data plane.
//!
//! Every mutation is resolved against the current document with the same
//! locator and reorder rules the tools use, built on a copy of the target
//! record, and written back only once it is complete, so a rejected action
//! leaves the document untouched.

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use thiserror::Error;

use appmodel_types::{
    error_codes, merge_into, ChildKind, Classification, DataObject, Document, Family, FlowKind,
    FlowRecord, HostAck, Item, LocatedRecord, ModelError, ModelStatus, Report, UserStory,
};

use crate::engine::locator::{ensure_unique_child, find_user_story, require_child};
use crate::engine::{move_named, names_match, EntityLocator, LocateError, Position, ReorderError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error(transparent)]
    Reorder(#[from] ReorderError),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    KindMismatch(String),

    #[error("{0}")]
    DuplicateStory(String),

    #[error("invalid record: {0}")]
    Record(#[from] serde_json::Error),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("failed to read model {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to save model to {path}: {source}")]
    Save {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("the model was not loaded from a file, so there is nowhere to save it")]
    NoSavePath,
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Locate(LocateError::NotFound { .. }) => error_codes::NOT_FOUND,
            Self::Locate(LocateError::Duplicate { .. }) | Self::DuplicateStory(_) => {
                error_codes::DUPLICATE_NAME
            }
            Self::Reorder(ReorderError::OutOfRange { .. }) => error_codes::INVALID_POSITION,
            Self::Reorder(ReorderError::NotFound { .. }) => error_codes::NOT_FOUND,
            Self::KindMismatch(_) => error_codes::KIND_MISMATCH,
            Self::InvalidRequest(_) | Self::Record(_) | Self::Model(_) | Self::Load { .. } => {
                error_codes::INVALID_REQUEST
            }
            Self::Save { .. } | Self::NoSavePath => error_codes::SAVE_FAILED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Add,
    Update,
    Replace,
    Move,
}

impl Verb {
    fn parse(verb: &str) -> Option<Verb> {
        match verb {
            "add" => Some(Verb::Add),
            "update" => Some(Verb::Update),
            "replace" => Some(Verb::Replace),
            "move" => Some(Verb::Move),
            _ => None,
        }
    }
}

/// A data-plane mutation named by its path, e.g. `move-report-column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub verb: Verb,
    pub family: Family,
    pub child: Option<ChildKind>,
}

impl Action {
    /// Parse `<verb>-<family>[-<child>]`; `None` for anything the host does not serve.
    pub fn parse(path: &str) -> Option<Action> {
        let (verb, rest) = path.split_once('-')?;
        let verb = Verb::parse(verb)?;
        let (family, child) = Family::ALL.into_iter().find_map(|family| {
            if rest == family.slug() {
                return Some((family, None));
            }
            let child = rest.strip_prefix(family.slug())?.strip_prefix('-')?;
            ChildKind::from_slug(child).map(|kind| (family, Some(kind)))
        })?;

        let supported = match (verb, child) {
            (Verb::Add | Verb::Update, None) => true,
            (Verb::Replace, None) => family.is_owned(),
            (Verb::Move, None) | (Verb::Replace, Some(_)) => false,
            (Verb::Add | Verb::Update | Verb::Move, Some(kind)) => {
                kind.collection_field(family).is_some()
            }
        };
        supported.then_some(Action {
            verb,
            family,
            child,
        })
    }
}

/// Where an owned entity sits, resolved before the document is borrowed mutably.
struct Target {
    position: Position,
    owner: String,
    name: String,
}

pub struct DocumentStore {
    document: Document,
    path: Option<PathBuf>,
    unsaved: bool,
}

impl DocumentStore {
    pub fn new(mut document: Document) -> Self {
        for conflict in document.classify() {
            tracing::warn!(%conflict, "flow record matches more than one kind");
        }
        Self {
            document,
            path: None,
            unsaved: false,
        }
    }

    /// Load a model file; `save` writes back to the same path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| StoreError::Load {
            path: path.display().to_string(),
            source,
        })?;
        let document: Document = serde_json::from_str(&text)?;
        let mut store = Self::new(document);
        store.path = Some(path.to_path_buf());
        tracing::info!(
            path = %path.display(),
            data_objects = store.document.data_objects().count(),
            "model loaded"
        );
        Ok(store)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    pub fn status(&self) -> ModelStatus {
        let kind_conflicts = self
            .document
            .data_objects()
            .flat_map(|o| o.object_workflow.iter())
            .filter_map(|f| f.conflict().map(|c| c.to_string()))
            .collect();
        ModelStatus {
            success: true,
            has_unsaved_changes: self.unsaved,
            data_object_count: self.document.data_objects().count(),
            user_story_count: self.document.user_stories().count(),
            kind_conflicts,
        }
    }

    /// Write the document as pretty-printed JSON to the file it was loaded from.
    pub fn save(&mut self) -> Result<PathBuf, StoreError> {
        let path = self.path.clone().ok_or(StoreError::NoSavePath)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&mut self, path: &Path) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&self.document)?;
        std::fs::write(path, text).map_err(|source| StoreError::Save {
            path: path.display().to_string(),
            source,
        })?;
        self.unsaved = false;
        tracing::info!(path = %path.display(), "model saved");
        Ok(())
    }

    // Queries

    pub fn data_objects(&self, name: Option<&str>) -> Vec<&DataObject> {
        self.document
            .data_objects()
            .filter(|o| name.is_none_or(|n| names_match(&o.name, n)))
            .collect()
    }

    /// Owned entities of `family` with their owners, filtered by owner and name.
    pub fn located(
        &self,
        family: Family,
        owner: Option<&str>,
        name: Option<&str>,
    ) -> Result<Vec<LocatedRecord>, StoreError> {
        let locator = EntityLocator::for_document(&self.document);
        let records: Vec<LocatedRecord> = match family.flow_kind() {
            Some(kind) => locator
                .flows(kind, owner, name)
                .into_iter()
                .map(|f| located_record(f.owner_object_name, f.entity))
                .collect::<Result<_, _>>()?,
            None => locator
                .reports(owner, name)
                .into_iter()
                .map(|r| located_record(r.owner_object_name, r.entity))
                .collect::<Result<_, _>>()?,
        };
        Ok(records)
    }

    pub fn user_stories(&self) -> Vec<&UserStory> {
        self.document.user_stories().collect()
    }

    // Mutations

    #[tracing::instrument(skip(self, body))]
    pub fn apply(&mut self, action: Action, body: &Map<String, Value>) -> Result<HostAck, StoreError> {
        let ack = match (action.family, action.verb, action.child) {
            (Family::DataObject, Verb::Add, None) => self.add_data_object(body),
            (Family::DataObject, Verb::Update, None) => self.update_data_object(body),
            (Family::UserStory, Verb::Add, None) => self.add_user_story(body),
            (Family::UserStory, Verb::Update, None) => self.update_user_story(body),
            (family, verb, child) if family.is_owned() => match (verb, child) {
                (Verb::Add, None) => self.add_owned(family, body),
                (Verb::Update, None) => self.update_owned(family, body),
                (Verb::Replace, None) => self.replace_owned(family, body),
                (Verb::Add, Some(kind)) => self.add_child(family, kind, body),
                (Verb::Update, Some(kind)) => self.update_child(family, kind, body),
                (Verb::Move, Some(kind)) => self.move_child(family, kind, body),
                (verb, child) => Err(unsupported(family, verb, child)),
            },
            (family, verb, child) => Err(unsupported(family, verb, child)),
        }?;
        self.unsaved = true;
        Ok(ack)
    }

    fn object_mut(&mut self, index: usize) -> Result<&mut DataObject, StoreError> {
        self.document
            .data_object_at_mut(index)
            .ok_or_else(|| StoreError::InvalidRequest(format!("no data object at {index}")))
    }

    fn report_mut(&mut self, position: Position) -> Result<&mut Report, StoreError> {
        self.object_mut(position.object)?
            .report
            .get_mut(position.index)
            .ok_or_else(|| StoreError::InvalidRequest("report moved during update".into()))
    }

    fn flow_mut(&mut self, position: Position) -> Result<&mut FlowRecord, StoreError> {
        self.object_mut(position.object)?
            .object_workflow
            .get_mut(position.index)
            .ok_or_else(|| StoreError::InvalidRequest("flow moved during update".into()))
    }

    fn children_mut(
        &mut self,
        family: Family,
        position: Position,
        kind: ChildKind,
    ) -> Result<&mut Vec<Item>, StoreError> {
        let items = match family.flow_kind() {
            None => self.report_mut(position)?.children_mut(kind),
            Some(_) => self.flow_mut(position)?.children_mut(kind),
        };
        items.ok_or_else(|| StoreError::InvalidRequest(format!("a {family} has no {kind} items")))
    }

    fn locate(&self, family: Family, name: &str, owner: Option<&str>) -> Result<Target, StoreError> {
        let locator = EntityLocator::for_document(&self.document);
        let target = match family.flow_kind() {
            Some(kind) => {
                let found = locator.find_flow(kind, name, owner)?;
                Target {
                    position: found.position,
                    owner: found.owner_object_name.to_string(),
                    name: found.entity.name.clone(),
                }
            }
            None => {
                let found = locator.find_report(name, owner)?;
                Target {
                    position: found.position,
                    owner: found.owner_object_name.to_string(),
                    name: found.entity.name.clone(),
                }
            }
        };
        Ok(target)
    }

    fn ensure_unique_rename(&self, family: Family, current: &str, record: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(new_name) = str_field(record, "name") {
            if !names_match(new_name, current) {
                EntityLocator::for_document(&self.document).ensure_unique(family, new_name)?;
            }
        }
        Ok(())
    }

    fn add_owned(&mut self, family: Family, body: &Map<String, Value>) -> Result<HostAck, StoreError> {
        let owner = required_str(body, "owner_object_name")?;
        let record = required_object(body, family.key())?;
        let name = required_str(record, "name")?;

        let locator = EntityLocator::for_document(&self.document);
        let found = locator.find_data_object(owner)?;
        let (object_index, owner) = (found.position.object, found.owner_object_name.to_string());
        locator.ensure_unique(family, name)?;

        let entity = match family.flow_kind() {
            Some(kind) => {
                let mut flow: FlowRecord = serde_json::from_value(Value::Object(record.clone()))?;
                check_flow_kind(&mut flow, kind)?;
                let value = serde_json::to_value(&flow)?;
                self.object_mut(object_index)?.object_workflow.push(flow);
                value
            }
            None => {
                let report: Report = serde_json::from_value(Value::Object(record.clone()))?;
                let value = serde_json::to_value(&report)?;
                self.object_mut(object_index)?.report.push(report);
                value
            }
        };
        tracing::info!(%family, name, owner = %owner, "entity added");
        Ok(HostAck::ok().with_entity(family.key(), entity).with_owner(owner))
    }

    fn update_owned(&mut self, family: Family, body: &Map<String, Value>) -> Result<HostAck, StoreError> {
        let name = required_str(body, family.name_key())?;
        let updates = non_empty_updates(body)?;
        let target = self.locate(family, name, optional_str(body, "owner_object_name"))?;
        self.ensure_unique_rename(family, &target.name, updates)?;

        let entity = match family.flow_kind() {
            Some(kind) => {
                let slot = self.flow_mut(target.position)?;
                let mut next = slot.clone();
                merge_into(&mut next, updates)?;
                check_flow_kind(&mut next, kind)?;
                *slot = next;
                serde_json::to_value(&*slot)?
            }
            None => {
                let slot = self.report_mut(target.position)?;
                let mut next = slot.clone();
                merge_into(&mut next, updates)?;
                *slot = next;
                serde_json::to_value(&*slot)?
            }
        };
        Ok(HostAck::ok()
            .with_entity(family.key(), entity)
            .with_owner(target.owner))
    }

    fn replace_owned(&mut self, family: Family, body: &Map<String, Value>) -> Result<HostAck, StoreError> {
        let name = required_str(body, family.name_key())?;
        let record = required_object(body, family.key())?;
        required_str(record, "name")?;
        let target = self.locate(family, name, optional_str(body, "owner_object_name"))?;
        self.ensure_unique_rename(family, &target.name, record)?;

        let entity = match family.flow_kind() {
            Some(kind) => {
                let mut flow: FlowRecord = serde_json::from_value(Value::Object(record.clone()))?;
                check_flow_kind(&mut flow, kind)?;
                let value = serde_json::to_value(&flow)?;
                *self.flow_mut(target.position)? = flow;
                value
            }
            None => {
                let report: Report = serde_json::from_value(Value::Object(record.clone()))?;
                let value = serde_json::to_value(&report)?;
                *self.report_mut(target.position)? = report;
                value
            }
        };
        Ok(HostAck::ok()
            .with_entity(family.key(), entity)
            .with_owner(target.owner))
    }

    fn add_child(
        &mut self,
        family: Family,
        kind: ChildKind,
        body: &Map<String, Value>,
    ) -> Result<HostAck, StoreError> {
        let parent = required_str(body, family.name_key())?;
        let record = required_object(body, kind.key())?;
        let item_name = required_str(record, kind.key_field())?;
        let target = self.locate(family, parent, optional_str(body, "owner_object_name"))?;

        let items = self.children_mut(family, target.position, kind)?;
        ensure_unique_child(items, kind, item_name, &target.name)?;
        items.push(Item::new(record.clone()));

        Ok(HostAck::ok()
            .with_entity(kind.key(), Value::Object(record.clone()))
            .with_entity(family.name_key(), json!(target.name))
            .with_owner(target.owner))
    }

    fn update_child(
        &mut self,
        family: Family,
        kind: ChildKind,
        body: &Map<String, Value>,
    ) -> Result<HostAck, StoreError> {
        let parent = required_str(body, family.name_key())?;
        let item_name = required_str(body, kind.name_key())?;
        let updates = non_empty_updates(body)?;
        let target = self.locate(family, parent, optional_str(body, "owner_object_name"))?;

        let items = self.children_mut(family, target.position, kind)?;
        let (index, existing) = require_child(items, kind, item_name, &target.name)?;
        let current = existing.text(kind.key_field()).unwrap_or(item_name).to_string();
        if let Some(new_name) = str_field(updates, kind.key_field()) {
            if !names_match(new_name, &current) {
                ensure_unique_child(items, kind, new_name, &target.name)?;
            }
        }

        let item = &mut items[index];
        for (key, value) in updates {
            item.attributes.insert(key.clone(), value.clone());
        }
        let entity = Value::Object(item.attributes.clone());
        Ok(HostAck::ok()
            .with_entity(kind.key(), entity)
            .with_entity(family.name_key(), json!(target.name))
            .with_owner(target.owner))
    }

    fn move_child(
        &mut self,
        family: Family,
        kind: ChildKind,
        body: &Map<String, Value>,
    ) -> Result<HostAck, StoreError> {
        let parent = required_str(body, family.name_key())?;
        let item_name = required_str(body, kind.name_key())?;
        let new_position = body
            .get("new_position")
            .and_then(Value::as_i64)
            .ok_or_else(|| StoreError::InvalidRequest("new_position required (integer)".into()))?;
        let target = self.locate(family, parent, optional_str(body, "owner_object_name"))?;

        let items = self.children_mut(family, target.position, kind)?;
        let outcome = move_named(items, item_name, new_position, |item| {
            item.text(kind.key_field())
        })?;
        tracing::info!(
            %family,
            %kind,
            item = item_name,
            from = outcome.old_index,
            to = outcome.new_index,
            "item moved"
        );
        Ok(HostAck::ok()
            .with_entity(family.name_key(), json!(target.name))
            .with_entity(kind.name_key(), json!(item_name))
            .with_owner(target.owner)
            .with_positions(outcome.old_index, outcome.new_index))
    }

    fn add_data_object(&mut self, body: &Map<String, Value>) -> Result<HostAck, StoreError> {
        let record = required_object(body, Family::DataObject.key())?;
        let name = required_str(record, "name")?;
        let locator = EntityLocator::for_document(&self.document);
        locator.ensure_unique(Family::DataObject, name)?;
        if let Some(parent) = str_field(record, "parentObjectName") {
            locator.find_data_object(parent)?;
        }

        let mut object: DataObject = serde_json::from_value(Value::Object(record.clone()))?;
        if let Some(conflict) = object.classify_flows().into_iter().next() {
            return Err(StoreError::KindMismatch(conflict.to_string()));
        }
        let entity = serde_json::to_value(&object)?;
        self.document.push_data_object(object)?;
        tracing::info!(name, "data object added");
        Ok(HostAck::ok().with_entity(Family::DataObject.key(), entity))
    }

    fn update_data_object(&mut self, body: &Map<String, Value>) -> Result<HostAck, StoreError> {
        let name = required_str(body, Family::DataObject.name_key())?;
        let updates = non_empty_updates(body)?;
        let locator = EntityLocator::for_document(&self.document);
        let found = locator.find_data_object(name)?;
        let (index, current) = (found.position.object, found.entity.name.clone());
        if let Some(parent) = str_field(updates, "parentObjectName") {
            if names_match(parent, &current) {
                return Err(StoreError::InvalidRequest(
                    "a data object cannot be its own parent".into(),
                ));
            }
            locator.find_data_object(parent)?;
        }
        self.ensure_unique_rename(Family::DataObject, &current, updates)?;

        let slot = self.object_mut(index)?;
        let mut next = slot.clone();
        merge_into(&mut next, updates)?;
        if let Some(conflict) = next.classify_flows().into_iter().next() {
            return Err(StoreError::KindMismatch(conflict.to_string()));
        }
        *slot = next;
        let entity = serde_json::to_value(&*slot)?;
        Ok(HostAck::ok().with_entity(Family::DataObject.key(), entity))
    }

    fn add_user_story(&mut self, body: &Map<String, Value>) -> Result<HostAck, StoreError> {
        let record = required_object(body, Family::UserStory.key())?;
        let mut story: UserStory = serde_json::from_value(Value::Object(record.clone()))?;
        if story.story_text.trim().is_empty() {
            return Err(StoreError::InvalidRequest("storyText required".into()));
        }
        self.ensure_story_text_free(&story.story_text, None)?;

        let number = match story.story_number.take() {
            Some(number) => {
                if self
                    .document
                    .user_stories()
                    .any(|s| s.story_number.as_deref() == Some(number.as_str()))
                {
                    return Err(StoreError::DuplicateStory(format!(
                        "User story number {number} is already used"
                    )));
                }
                number
            }
            None => self.next_story_number().to_string(),
        };
        story.story_number = Some(number);

        let entity = serde_json::to_value(&story)?;
        self.document.push_user_story(story)?;
        Ok(HostAck::ok().with_entity(Family::UserStory.key(), entity))
    }

    fn update_user_story(&mut self, body: &Map<String, Value>) -> Result<HostAck, StoreError> {
        let key = match body.get(Family::UserStory.name_key()) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(StoreError::InvalidRequest(format!(
                    "{} required",
                    Family::UserStory.name_key()
                )))
            }
        };
        let updates = non_empty_updates(body)?;
        let (index, _) = find_user_story(self.document.user_stories(), &key)?;
        if let Some(text) = str_field(updates, "storyText") {
            self.ensure_story_text_free(text, Some(index))?;
        }

        let slot = self
            .document
            .user_story_at_mut(index)
            .ok_or_else(|| StoreError::InvalidRequest("user story moved during update".into()))?;
        let mut next = slot.clone();
        merge_into(&mut next, updates)?;
        *slot = next;
        let entity = serde_json::to_value(&*slot)?;
        Ok(HostAck::ok().with_entity(Family::UserStory.key(), entity))
    }

    fn ensure_story_text_free(&self, text: &str, except: Option<usize>) -> Result<(), StoreError> {
        let taken = self
            .document
            .user_stories()
            .enumerate()
            .any(|(i, s)| Some(i) != except && names_match(s.story_text.trim(), text.trim()));
        if taken {
            return Err(StoreError::DuplicateStory(
                "A user story with this text already exists".into(),
            ));
        }
        Ok(())
    }

    fn next_story_number(&self) -> u64 {
        self.document
            .user_stories()
            .filter_map(|s| s.story_number.as_deref()?.parse::<u64>().ok())
            .max()
            .map_or(1, |n| n + 1)
    }
}

fn unsupported(family: Family, verb: Verb, child: Option<ChildKind>) -> StoreError {
    StoreError::InvalidRequest(format!(
        "{verb:?} is not supported for {family}{}",
        child.map(|c| format!(" {c}")).unwrap_or_default()
    ))
}

fn located_record<T: serde::Serialize>(owner: &str, entity: &T) -> Result<LocatedRecord, StoreError> {
    Ok(LocatedRecord {
        owner_object_name: Some(owner.to_string()),
        entity: serde_json::to_value(entity)?,
    })
}

/// Classify a new or changed flow and reject it unless it is still `expected`.
fn check_flow_kind(flow: &mut FlowRecord, expected: FlowKind) -> Result<(), StoreError> {
    match flow.classify().clone() {
        Classification::Kind(kind) if kind == expected => Ok(()),
        Classification::Kind(kind) => Err(StoreError::KindMismatch(format!(
            "'{}' would be classified as a {kind}, not a {expected}",
            flow.name
        ))),
        Classification::Conflict(conflict) => Err(StoreError::KindMismatch(conflict.to_string())),
        Classification::Unclassified => Ok(()),
    }
}

fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}

fn optional_str<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    str_field(map, key).filter(|s| !s.is_empty())
}

fn required_str<'a>(map: &'a Map<String, Value>, key: &str) -> Result<&'a str, StoreError> {
    optional_str(map, key).ok_or_else(|| StoreError::InvalidRequest(format!("{key} required")))
}

fn required_object<'a>(
    map: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a Map<String, Value>, StoreError> {
    map.get(key)
        .and_then(Value::as_object)
        .ok_or_else(|| StoreError::InvalidRequest(format!("{key} required (object)")))
}

fn non_empty_updates(body: &Map<String, Value>) -> Result<&Map<String, Value>, StoreError> {
    let updates = required_object(body, "updates")?;
    if updates.is_empty() {
        return Err(StoreError::InvalidRequest(
            "updates: at least one property must be provided".into(),
        ));
    }
    Ok(updates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store() -> DocumentStore {
        let doc = Document::from_value(json!({
            "root": {
                "name": "Shop",
                "namespace": [{
                    "name": "Main",
                    "object": [
                        {"name": "Tac"},
                        {
                            "name": "Customer",
                            "parentObjectName": "Tac",
                            "report": [{
                                "name": "CustomerList",
                                "reportColumn": [
                                    {"name": "A"}, {"name": "B"}, {"name": "C"}, {"name": "D"}
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
                            "report": [{"name": "OrderList"}]
                        }
                    ],
                    "userStory": [{"storyNumber": "4", "storyText": "A Manager wants to view orders"}]
                }]
            }
        }))
        .unwrap();
        DocumentStore::new(doc)
    }

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn action(path: &str) -> Action {
        Action::parse(path).unwrap()
    }

    #[test]
    fn test_action_paths() {
        assert_eq!(
            Action::parse("move-general-flow-output-var"),
            Some(Action {
                verb: Verb::Move,
                family: Family::GeneralFlow,
                child: Some(ChildKind::OutputVar),
            })
        );
        assert_eq!(
            Action::parse("add-data-object").map(|a| a.family),
            Some(Family::DataObject)
        );
        assert!(Action::parse("replace-data-object").is_none());
        assert!(Action::parse("move-report").is_none());
        assert!(Action::parse("add-workflow-column").is_none());
        assert!(Action::parse("delete-report").is_none());
        assert!(Action::parse("reports").is_none());
    }

    #[test]
    fn test_move_column_splices() {
        let mut store = store();
        let ack = store
            .apply(
                action("move-report-column"),
                &body(json!({"report_name": "customerlist", "column_name": "B", "new_position": 3})),
            )
            .unwrap();
        assert_eq!((ack.old_position, ack.new_position), (Some(1), Some(3)));
        let report = &store.document().data_objects().nth(1).unwrap().report[0];
        let order: Vec<_> = report
            .report_column
            .iter()
            .filter_map(|c| c.text("name"))
            .collect();
        assert_eq!(order, vec!["A", "C", "D", "B"]);
        assert!(store.has_unsaved_changes());
    }

    #[test]
    fn test_rejected_move_leaves_document_unchanged() {
        let mut store = store();
        let before = store.document().clone();
        let err = store
            .apply(
                action("move-report-column"),
                &body(json!({"report_name": "CustomerList", "column_name": "B", "new_position": 4})),
            )
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_POSITION");
        assert_eq!(store.document(), &before);
        assert!(!store.has_unsaved_changes());
    }

    #[test]
    fn test_move_matches_item_name_exactly() {
        let mut store = store();
        let before = store.document().clone();
        let err = store
            .apply(
                action("move-report-column"),
                &body(json!({"report_name": "CustomerList", "column_name": "b", "new_position": 0})),
            )
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(store.document(), &before);

        let ack = store
            .apply(
                action("move-report-column"),
                &body(json!({"report_name": "CustomerList", "column_name": "B", "new_position": 0})),
            )
            .unwrap();
        assert_eq!((ack.old_position, ack.new_position), (Some(1), Some(0)));
    }

    #[test]
    fn test_add_report_requires_owner_and_unique_name() {
        let mut store = store();
        let err = store
            .apply(
                action("add-report"),
                &body(json!({"owner_object_name": "Invoice", "report": {"name": "InvoiceList"}})),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Data object 'Invoice' not found");

        let err = store
            .apply(
                action("add-report"),
                &body(json!({"owner_object_name": "Tac", "report": {"name": "ORDERLIST"}})),
            )
            .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_NAME");
    }

    #[test]
    fn test_update_workflow_cannot_change_kind() {
        let mut store = store();
        let err = store
            .apply(
                action("update-workflow"),
                &body(json!({"workflow_name": "ApproveCustomer", "updates": {"isDynaFlow": "false"}})),
            )
            .unwrap_err();
        assert_eq!(err.code(), "KIND_MISMATCH");
        let flow = &store.document().data_objects().nth(1).unwrap().object_workflow[1];
        assert_eq!(flow.is_dyna_flow.as_deref(), Some("true"));
    }

    #[test]
    fn test_general_flow_lookup_misses_workflow() {
        let mut store = store();
        let err = store
            .apply(
                action("update-general-flow"),
                &body(json!({"general_flow_name": "ApproveCustomer", "updates": {"titleText": "x"}})),
            )
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        assert!(err.to_string().contains("workflow"));
    }

    #[test]
    fn test_located_reports_carry_owner() {
        let store = store();
        let all = store.located(Family::Report, None, None).unwrap();
        assert_eq!(all.len(), 2);
        let filtered = store
            .located(Family::Report, Some("order"), Some("orderlist"))
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].owner_object_name.as_deref(), Some("Order"));
    }

    #[test]
    fn test_user_story_numbering() {
        let mut store = store();
        let ack = store
            .apply(
                action("add-user-story"),
                &body(json!({"user_story": {"storyText": "A Clerk wants to ship orders"}})),
            )
            .unwrap();
        assert_eq!(ack.entity("user_story").unwrap()["storyNumber"], json!("5"));

        let err = store
            .apply(
                action("add-user-story"),
                &body(json!({"user_story": {"storyText": " a manager wants to view ORDERS "}})),
            )
            .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_NAME");
    }

    #[test]
    fn test_save_writes_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, serde_json::to_string(store().document()).unwrap()).unwrap();

        let mut store = DocumentStore::load(&path).unwrap();
        store
            .apply(
                action("update-data-object"),
                &body(json!({"data_object_name": "order", "updates": {"isLookup": "false"}})),
            )
            .unwrap();
        assert!(store.has_unsaved_changes());
        assert_eq!(store.save().unwrap(), path);
        assert!(!store.has_unsaved_changes());

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  "));
        let reloaded = DocumentStore::load(&path).unwrap();
        assert_eq!(reloaded.data_objects(Some("Order"))[0].attributes["isLookup"], json!("false"));
    }

    #[test]
    fn test_save_without_path_fails() {
        let mut store = store();
        assert_eq!(store.save().unwrap_err().code(), "SAVE_FAILED");
    }
}
