use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use super::error::ReservationError;
use super::order::{CreateOrderRequest, Order};
use super::workflow::ReservationWorkflow;
use crate::services::inventory::FetchFailure;

pub fn router(workflow: ReservationWorkflow) -> Router {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/confirm", post(confirm_order))
        .route("/orders/:id/cancel", post(cancel_order))
        .with_state(workflow)
}

impl ReservationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReservationError::InvalidOrder(_) => StatusCode::BAD_REQUEST,
            ReservationError::ProductFetchFailed {
                cause: FetchFailure::NotFound,
                ..
            }
            | ReservationError::OrderNotFound(_) => StatusCode::NOT_FOUND,
            ReservationError::ProductFetchFailed { .. }
            | ReservationError::ServiceUnavailable(_)
            | ReservationError::StockUpdateFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ReservationError::InsufficientStock { .. }
            | ReservationError::ReservationFailed { .. }
            | ReservationError::InvalidTransition { .. } => StatusCode::CONFLICT,
            ReservationError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ReservationError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.to_string() });
        if let ReservationError::ReservationFailed { order_id, .. }
        | ReservationError::StockUpdateFailed { order_id, .. } = &self
        {
            body["orderId"] = json!(order_id);
        }
        (self.status_code(), Json(body)).into_response()
    }
}

async fn create_order(
    State(workflow): State<ReservationWorkflow>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ReservationError> {
    let order = workflow.create_order(&request.user_id, request.items).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(State(workflow): State<ReservationWorkflow>) -> Result<Json<Vec<Order>>, ReservationError> {
    workflow.list_orders().await.map(Json)
}

async fn get_order(
    State(workflow): State<ReservationWorkflow>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ReservationError> {
    workflow.get_order(&id).await.map(Json)
}

async fn confirm_order(
    State(workflow): State<ReservationWorkflow>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ReservationError> {
    workflow.confirm_order(&id).await.map(Json)
}

async fn cancel_order(
    State(workflow): State<ReservationWorkflow>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ReservationError> {
    workflow.cancel_order(&id).await.map(Json)
}
