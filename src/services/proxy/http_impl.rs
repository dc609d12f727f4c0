use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use super::error::ProxyError;
use super::forwarder::ApiProxy;

pub fn router(proxy: ApiProxy) -> Router {
    Router::new()
        .route("/", get(index))
        .fallback(forward)
        .with_state(proxy)
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match self {
            ProxyError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::ServiceUnavailable { .. } => {
                tracing::warn!(error = %self, "Proxy error");
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn index(State(proxy): State<ApiProxy>) -> Json<serde_json::Value> {
    let services: Vec<String> = proxy
        .routes()
        .iter()
        .map(|route| format!("{} - {}", route.prefix, route.app_id))
        .collect();
    Json(json!({ "message": "API Gateway is running", "services": services }))
}

async fn forward(
    State(proxy): State<ApiProxy>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    proxy.forward(method, &uri, &headers, body).await.map(IntoResponse::into_response)
}
