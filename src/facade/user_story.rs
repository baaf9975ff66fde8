//! User story tools.
//!
//! Stories are identified by `storyNumber` (assigned by the host when a new
//! story omits it) and must have distinct `storyText`, compared without case.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use appmodel_types::{Family, Plane, UserStory};

use super::{check, object, parse, post_action, text, to_value};
use crate::bridge::{Bridge, BridgeRequest};
use crate::catalog::FamilyCatalog;
use crate::config::TimeoutClass;
use crate::engine::locator::find_user_story;
use crate::engine::{names_match, PropertyProjector, UpdateMode};
use crate::error::ToolError;

pub struct UserStoryFacade {
    bridge: Arc<dyn Bridge>,
    catalog: Arc<FamilyCatalog>,
}

impl UserStoryFacade {
    pub(crate) fn new(bridge: Arc<dyn Bridge>, catalog: Arc<FamilyCatalog>) -> Self {
        Self { bridge, catalog }
    }

    pub fn catalog(&self) -> &FamilyCatalog {
        &self.catalog
    }

    fn projector(&self) -> PropertyProjector<'_> {
        PropertyProjector::new(&self.catalog.projection)
    }

    async fn fetch(&self) -> Result<Vec<UserStory>, ToolError> {
        let request = BridgeRequest::get(
            Plane::Data,
            format!("/api/{}", Family::UserStory.collection_slug()),
            TimeoutClass::Fetch,
        );
        parse(self.bridge.exchange(request).await?, "user stories")
    }

    pub async fn list(&self) -> Result<Value, ToolError> {
        let stories = self.fetch().await?;
        let projector = self.projector();
        let items = stories
            .iter()
            .map(|story| to_value(story, "user story").map(|v| projector.to_public(&v)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(json!({
            "success": true,
            "count": items.len(),
            "user_stories": items,
        }))
    }

    #[tracing::instrument(skip(self, payload))]
    pub async fn add(&self, payload: &Map<String, Value>) -> Result<Value, ToolError> {
        let record = self.projector().to_canonical(payload);
        check(&self.catalog.validator, self.projector(), &record, UpdateMode::Full)?;
        let story_text = text(&record, "storyText").unwrap_or_default();

        let stories = self.fetch().await?;
        if let Some(existing) = stories
            .iter()
            .find(|s| names_match(s.story_text.trim(), story_text.trim()))
        {
            return Err(ToolError::DuplicateName(format!(
                "A user story with this text already exists (story {})",
                existing.story_number.as_deref().unwrap_or("without a number")
            )));
        }
        if let Some(number) = text(&record, "storyNumber") {
            if stories.iter().any(|s| s.story_number.as_deref() == Some(number)) {
                return Err(ToolError::DuplicateName(format!(
                    "User story number {number} is already used"
                )));
            }
        }

        let sent = Value::Object(record);
        let ack = post_action(
            &*self.bridge,
            "add-user-story",
            object([(Family::UserStory.key(), sent.clone())]),
        )
        .await?;
        let entity = ack.entity(Family::UserStory.key()).cloned().unwrap_or(sent);
        Ok(json!({
            "success": true,
            "user_story": self.projector().to_public(&entity),
        }))
    }

    /// Update the story whose number (or, failing that, text) matches `key`.
    #[tracing::instrument(skip(self, updates))]
    pub async fn update(&self, key: &str, updates: &Map<String, Value>) -> Result<Value, ToolError> {
        let updates = self.projector().to_canonical(updates);
        check(&self.catalog.validator, self.projector(), &updates, UpdateMode::Partial)?;

        let stories = self.fetch().await?;
        let (index, story) = find_user_story(&stories, key)?;
        if let Some(new_text) = text(&updates, "storyText") {
            let clash = stories
                .iter()
                .enumerate()
                .any(|(i, s)| i != index && names_match(s.story_text.trim(), new_text.trim()));
            if clash {
                return Err(ToolError::DuplicateName(
                    "A user story with this text already exists".to_string(),
                ));
            }
        }

        let story_key = story.story_number.clone().unwrap_or_else(|| key.to_string());
        let body = object([
            (Family::UserStory.name_key(), json!(story_key)),
            ("updates", Value::Object(updates)),
        ]);
        let ack = post_action(&*self.bridge, "update-user-story", body).await?;
        let entity = match ack.entity(Family::UserStory.key()) {
            Some(entity) => entity.clone(),
            None => to_value(story, "user story")?,
        };
        Ok(json!({
            "success": true,
            "user_story": self.projector().to_public(&entity),
        }))
    }
}
