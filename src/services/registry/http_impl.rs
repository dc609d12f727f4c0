//! Registry HTTP surface, kept wire-compatible with existing Eureka clients.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::json;

use super::descriptor::InstanceDescriptor;
use super::error::RegistryError;
use super::service::RegistryStore;

pub fn router(store: RegistryStore) -> Router {
    Router::new()
        .route("/eureka/apps", get(list_applications))
        .route(
            "/eureka/apps/:app_id",
            get(get_application).post(register_instance),
        )
        .route(
            "/eureka/apps/:app_id/:instance_id",
            put(heartbeat).delete(deregister_instance),
        )
        .with_state(store)
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let status = match self {
            RegistryError::ApplicationNotFound(_) | RegistryError::InstanceNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            RegistryError::MalformedDescriptor(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn register_instance(
    State(store): State<RegistryStore>,
    Path(app_id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, RegistryError> {
    let descriptor = InstanceDescriptor::decode(&app_id, &body).inspect_err(|e| {
        tracing::warn!(app_id = %app_id, error = %e, "Rejected registration");
    })?;
    store.register(&app_id, descriptor.into_instance(&app_id));
    Ok(StatusCode::NO_CONTENT)
}

async fn heartbeat(
    State(store): State<RegistryStore>,
    Path((app_id, instance_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, RegistryError> {
    store.heartbeat(&app_id, &instance_id)?;
    Ok(Json(json!({ "message": "Heartbeat received" })))
}

async fn deregister_instance(
    State(store): State<RegistryStore>,
    Path((app_id, instance_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, RegistryError> {
    store.deregister(&app_id, &instance_id)?;
    Ok(Json(json!({ "message": "Service deregistered successfully" })))
}

async fn list_applications(State(store): State<RegistryStore>) -> Json<serde_json::Value> {
    let applications: Vec<_> = store
        .applications()
        .iter()
        .map(|app| app.to_eureka_json())
        .collect();
    Json(json!({ "applications": { "application": applications } }))
}

async fn get_application(
    State(store): State<RegistryStore>,
    Path(app_id): Path<String>,
) -> Result<Json<serde_json::Value>, RegistryError> {
    let application = store.application(&app_id)?;
    Ok(Json(json!({ "application": application.to_eureka_json() })))
}
