//! HTTP routes for both bridge planes.
//!
//! ## Data plane
//!
//! - `GET  /api/data-objects[?data_object_name=]` - snapshot of data objects
//! - `GET  /api/user-stories` - every user story
//! - `GET  /api/model-status` - counts, unsaved flag, kind conflicts
//! - `GET  /api/<collection>[?owner_object_name=&<entity>_name=]` - owned entities with owners
//! - `POST /api/<verb>-<family>[-<child>]` - one mutation
//!
//! ## Command plane
//!
//! - `POST /api/execute-command` - save the model, open a view, log in or out
//! - `GET  /api/auth-status` - login probe

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use appmodel_types::{
    error_codes, AuthStatus, CommandRequest, CommandResponse, DataObject, Family, HostAck,
    LocatedRecord, ModelStatus, UserStory,
};

use super::commands::{accepted, rejected};
use super::store::{Action, StoreError};
use super::HostState;
use crate::bridge::auth::AUTH_STATUS_PATH;
use crate::facade::commands::{EXECUTE_COMMAND_PATH, MODEL_STATUS_PATH, SAVE_MODEL_COMMAND};

type Rejection = (StatusCode, Json<HostAck>);

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match self.code() {
            error_codes::NOT_FOUND => StatusCode::NOT_FOUND,
            error_codes::DUPLICATE_NAME => StatusCode::CONFLICT,
            error_codes::KIND_MISMATCH => StatusCode::UNPROCESSABLE_ENTITY,
            error_codes::SAVE_FAILED => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, Json(HostAck::failure(self.code(), self.to_string()))).into_response()
    }
}

/// Data-plane router.
pub fn data_router(state: HostState) -> Router {
    Router::new()
        .route("/api/data-objects", get(list_data_objects))
        .route("/api/user-stories", get(list_user_stories))
        .route(MODEL_STATUS_PATH, get(model_status))
        .route("/api/:resource", get(list_owned).post(apply_action))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Command-plane router.
pub fn command_router(state: HostState) -> Router {
    Router::new()
        .route(EXECUTE_COMMAND_PATH, post(execute_command))
        .route(AUTH_STATUS_PATH, get(auth_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// DATA PLANE
// ============================================================================

async fn list_data_objects(
    State(state): State<HostState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Vec<DataObject>> {
    let name = params
        .get(Family::DataObject.name_key())
        .map(String::as_str)
        .filter(|s| !s.is_empty());
    let store = state.store.lock().await;
    Json(store.data_objects(name).into_iter().cloned().collect())
}

async fn list_user_stories(State(state): State<HostState>) -> Json<Vec<UserStory>> {
    let store = state.store.lock().await;
    Json(store.user_stories().into_iter().cloned().collect())
}

async fn model_status(State(state): State<HostState>) -> Json<ModelStatus> {
    Json(state.store.lock().await.status())
}

/// GET /api/{collection}
async fn list_owned(
    State(state): State<HostState>,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<LocatedRecord>>, Rejection> {
    let family = Family::from_collection_slug(&resource)
        .filter(|f| f.is_owned())
        .ok_or_else(|| unknown_resource(&resource))?;
    let param = |key: &str| params.get(key).map(String::as_str).filter(|s| !s.is_empty());

    let store = state.store.lock().await;
    let records = store
        .located(family, param("owner_object_name"), param(family.name_key()))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HostAck::failure(e.code(), e.to_string())),
            )
        })?;
    Ok(Json(records))
}

/// POST /api/{verb}-{family}[-{child}]
async fn apply_action(
    State(state): State<HostState>,
    Path(resource): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<HostAck>, Response> {
    let action = Action::parse(&resource).ok_or_else(|| unknown_resource(&resource).into_response())?;
    let Value::Object(body) = body else {
        return Err(StoreError::InvalidRequest("request body must be a JSON object".into()).into_response());
    };

    let mut store = state.store.lock().await;
    match store.apply(action, &body) {
        Ok(ack) => Ok(Json(ack)),
        Err(err) => {
            tracing::warn!(action = %resource, code = err.code(), error = %err, "action rejected");
            Err(err.into_response())
        }
    }
}

fn unknown_resource(resource: &str) -> Rejection {
    (
        StatusCode::NOT_FOUND,
        Json(HostAck::failure(
            error_codes::INVALID_REQUEST,
            format!("Unknown endpoint: /api/{resource}"),
        )),
    )
}

// ============================================================================
// COMMAND PLANE
// ============================================================================

async fn execute_command(
    State(state): State<HostState>,
    Json(request): Json<CommandRequest>,
) -> (StatusCode, Json<CommandResponse>) {
    let response = if request.command == SAVE_MODEL_COMMAND {
        let mut store = state.store.lock().await;
        match store.save() {
            Ok(path) => accepted(json!({"path": path.display().to_string()})),
            Err(err) => {
                tracing::error!(error = %err, "save failed");
                rejected(err.code(), err.to_string())
            }
        }
    } else {
        state.session.execute(request).await
    };

    let status = match response.error_code.as_deref() {
        None => StatusCode::OK,
        Some(error_codes::SAVE_FAILED) => StatusCode::INTERNAL_SERVER_ERROR,
        Some(_) => StatusCode::BAD_REQUEST,
    };
    (status, Json(response))
}

async fn auth_status(State(state): State<HostState>) -> Json<AuthStatus> {
    Json(state.session.auth_status().await)
}
