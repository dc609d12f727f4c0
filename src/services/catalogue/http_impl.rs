use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::error::CatalogueError;
use super::store::{
    AvailabilityRequest, CatalogueProduct, CatalogueStore, NewProduct, ProductFilter, ProductUpdate,
};
use crate::services::inventory::StockDelta;

pub fn router(store: CatalogueStore) -> Router {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/check-availability", post(check_availability))
        .route("/products/batch", post(get_products_by_ids))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/:id/stock", patch(update_stock))
        .with_state(store)
}

#[derive(Debug, Deserialize)]
struct AvailabilityBody {
    products: Vec<AvailabilityRequest>,
}

#[derive(Debug, Deserialize)]
struct BatchBody {
    ids: Vec<String>,
}

impl IntoResponse for CatalogueError {
    fn into_response(self) -> Response {
        let status = match self {
            CatalogueError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogueError::InsufficientStock { .. } => StatusCode::CONFLICT,
            CatalogueError::Validation(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

async fn create_product(
    State(store): State<CatalogueStore>,
    Json(new): Json<NewProduct>,
) -> Result<(StatusCode, Json<CatalogueProduct>), CatalogueError> {
    let product = store.create(new)?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn list_products(
    State(store): State<CatalogueStore>,
    Query(filter): Query<ProductFilter>,
) -> Json<Vec<CatalogueProduct>> {
    Json(store.list(&filter))
}

async fn get_product(
    State(store): State<CatalogueStore>,
    Path(id): Path<String>,
) -> Result<Json<CatalogueProduct>, CatalogueError> {
    store.get(&id).map(Json)
}

async fn update_stock(
    State(store): State<CatalogueStore>,
    Path(id): Path<String>,
    Json(delta): Json<StockDelta>,
) -> Result<Json<CatalogueProduct>, CatalogueError> {
    store.update_stock(&id, delta.quantity).map(Json)
}

async fn update_product(
    State(store): State<CatalogueStore>,
    Path(id): Path<String>,
    Json(update): Json<ProductUpdate>,
) -> Result<Json<CatalogueProduct>, CatalogueError> {
    store.update(&id, update).map(Json)
}

async fn delete_product(
    State(store): State<CatalogueStore>,
    Path(id): Path<String>,
) -> Result<StatusCode, CatalogueError> {
    store.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn check_availability(
    State(store): State<CatalogueStore>,
    Json(body): Json<AvailabilityBody>,
) -> Json<serde_json::Value> {
    Json(json!({ "available": store.check_availability(&body.products) }))
}

async fn get_products_by_ids(
    State(store): State<CatalogueStore>,
    Json(body): Json<BatchBody>,
) -> Json<Vec<CatalogueProduct>> {
    Json(store.get_many(&body.ids))
}
