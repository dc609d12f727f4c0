use async_trait::async_trait;
use futures::future::try_join_all;
use std::time::Duration;

use super::error::{FetchFailure, GatewayError};
use super::types::{LineItem, Product, StockDelta, requested_totals};
use crate::services::discovery::DiscoveryClient;

/// Remote view of the catalogue used by the reservation workflow.
#[async_trait]
pub trait InventoryGateway: Send + Sync {
    async fn get_product(&self, product_id: &str) -> Result<Product, GatewayError>;

    /// Atomically takes `quantity` units from the product's stock.
    async fn reserve_stock(&self, product_id: &str, quantity: u32) -> Result<Product, GatewayError>;

    /// True only if, for every product, the summed quantity of its lines fits
    /// in current stock. Products are fetched concurrently; the first failure
    /// aborts the whole check.
    async fn check_availability(&self, items: &[LineItem]) -> Result<bool, GatewayError> {
        let totals = requested_totals(items);
        let products = try_join_all(totals.iter().map(|(product_id, _)| self.get_product(product_id)))
            .await
            .map_err(|e| GatewayError::AvailabilityCheckFailed(Box::new(e)))?;

        Ok(totals
            .iter()
            .zip(products.iter())
            .all(|((_, requested), product)| *requested <= u64::from(product.stock)))
    }
}

/// 网关配置
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// 目录服务在注册中心中的应用名
    pub catalogue_app_id: String,
    /// 单次请求超时
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            catalogue_app_id: "catalogue-service".to_string(),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// [`InventoryGateway`] over the catalogue HTTP API, located through the
/// discovery client on every call.
#[derive(Debug, Clone)]
pub struct CatalogueGateway {
    discovery: DiscoveryClient,
    config: GatewayConfig,
    client: reqwest::Client,
}

impl CatalogueGateway {
    pub fn new(discovery: DiscoveryClient, config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            discovery,
            config,
            client,
        })
    }

    async fn product_url(&self, product_id: &str) -> Result<String, GatewayError> {
        let endpoint = self.discovery.resolve(&self.config.catalogue_app_id).await?;
        Ok(format!("{}/products/{}", endpoint.base_url(), product_id))
    }
}

fn transport(e: impl std::fmt::Display) -> FetchFailure {
    FetchFailure::Transport(e.to_string())
}

#[async_trait]
impl InventoryGateway for CatalogueGateway {
    async fn get_product(&self, product_id: &str) -> Result<Product, GatewayError> {
        let fetch_failed = |cause| GatewayError::ProductFetchFailed {
            product_id: product_id.to_string(),
            cause,
        };

        let url = self.product_url(product_id).await?;
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| fetch_failed(transport(e)))?;

        match response.status() {
            http::StatusCode::NOT_FOUND => Err(fetch_failed(FetchFailure::NotFound)),
            status if !status.is_success() => Err(fetch_failed(transport(format!(
                "catalogue returned {status}"
            )))),
            _ => response
                .json::<Product>()
                .await
                .map_err(|e| fetch_failed(transport(format!("invalid product response: {e}")))),
        }
    }

    async fn reserve_stock(&self, product_id: &str, quantity: u32) -> Result<Product, GatewayError> {
        let update_failed = |cause| GatewayError::StockUpdateFailed {
            product_id: product_id.to_string(),
            cause,
        };

        let url = format!("{}/stock", self.product_url(product_id).await?);
        let response = self
            .client
            .patch(&url)
            .json(&StockDelta {
                quantity: -i64::from(quantity),
            })
            .send()
            .await
            .map_err(|e| update_failed(transport(e)))?;

        match response.status() {
            http::StatusCode::CONFLICT => Err(GatewayError::InsufficientStock {
                product_id: product_id.to_string(),
                requested: quantity,
            }),
            http::StatusCode::NOT_FOUND => Err(update_failed(FetchFailure::NotFound)),
            status if !status.is_success() => Err(update_failed(transport(format!(
                "catalogue returned {status}"
            )))),
            _ => response
                .json::<Product>()
                .await
                .map_err(|e| update_failed(transport(format!("invalid product response: {e}")))),
        }
    }
}
