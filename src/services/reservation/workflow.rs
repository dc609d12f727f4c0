use futures::future::try_join_all;
use std::sync::Arc;
use uuid::Uuid;

use super::error::ReservationError;
use super::order::{Order, OrderStatus};
use super::store::OrderStore;
use crate::services::inventory::{
    FetchFailure, GatewayError, InventoryGateway, LineItem, Product, requested_totals,
};

/// Orchestrates order creation against the remote catalogue.
#[derive(Clone)]
pub struct ReservationWorkflow {
    gateway: Arc<dyn InventoryGateway>,
    orders: Arc<dyn OrderStore>,
}

// 预留阶段之前的网关错误映射
impl From<GatewayError> for ReservationError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unresolved(e) => ReservationError::ServiceUnavailable(e),
            GatewayError::ProductFetchFailed { product_id, cause }
            | GatewayError::StockUpdateFailed { product_id, cause } => {
                ReservationError::ProductFetchFailed { product_id, cause }
            }
            GatewayError::AvailabilityCheckFailed(inner) => (*inner).into(),
            GatewayError::InsufficientStock {
                product_id,
                requested,
            } => ReservationError::InsufficientStock {
                product_id,
                requested,
                available: 0,
            },
        }
    }
}

impl ReservationWorkflow {
    pub fn new(gateway: Arc<dyn InventoryGateway>, orders: Arc<dyn OrderStore>) -> Self {
        Self { gateway, orders }
    }

    /// Creates a `PENDING` order and then decrements catalogue stock product by
    /// product. Lines for the same product are checked and reserved as one
    /// total. Stock decrement is best-effort and not atomic with order
    /// creation: a failed decrement leaves the order persisted and `PENDING`.
    pub async fn create_order(&self, user_id: &str, items: Vec<LineItem>) -> Result<Order, ReservationError> {
        let totals = Self::validate(user_id, &items)?;

        let products: Vec<Product> =
            try_join_all(totals.iter().map(|(product_id, _)| self.gateway.get_product(product_id))).await?;

        // 先用读取到的库存校验，避免明显不足的订单被持久化
        for ((product_id, requested), product) in totals.iter().zip(products.iter()) {
            if *requested > product.stock {
                tracing::info!(
                    product_id = %product_id,
                    requested = *requested,
                    available = product.stock,
                    "Rejected order, insufficient stock"
                );
                return Err(ReservationError::InsufficientStock {
                    product_id: product_id.clone(),
                    requested: *requested,
                    available: product.stock,
                });
            }
        }

        let total_amount: f64 = totals
            .iter()
            .zip(products.iter())
            .map(|((_, quantity), product)| product.price * f64::from(*quantity))
            .sum();

        let order = Order::new(Uuid::new_v4().to_string(), user_id.to_string(), items, total_amount);
        let order = self.orders.create(order).await?;
        tracing::info!(
            order_id = %order.id,
            user_id = %order.user_id,
            total_amount = order.total_amount,
            items = order.items.len(),
            "Created order"
        );

        for (product_id, quantity) in &totals {
            match self.gateway.reserve_stock(product_id, *quantity).await {
                Ok(product) => {
                    tracing::debug!(
                        order_id = %order.id,
                        product_id = %product_id,
                        remaining = product.stock,
                        "Reserved stock"
                    );
                }
                Err(GatewayError::InsufficientStock { product_id, .. }) => {
                    tracing::warn!(order_id = %order.id, product_id = %product_id, "Stock reservation failed");
                    return Err(ReservationError::ReservationFailed {
                        order_id: order.id.clone(),
                        product_id,
                    });
                }
                Err(GatewayError::Unresolved(e)) => {
                    tracing::warn!(order_id = %order.id, error = %e, "Catalogue unresolved during reservation");
                    return Err(ReservationError::ServiceUnavailable(e));
                }
                Err(e) => {
                    tracing::warn!(order_id = %order.id, product_id = %product_id, error = %e, "Stock update failed");
                    let cause = match e.root() {
                        GatewayError::StockUpdateFailed { cause, .. }
                        | GatewayError::ProductFetchFailed { cause, .. } => cause.clone(),
                        other => FetchFailure::Transport(other.to_string()),
                    };
                    return Err(ReservationError::StockUpdateFailed {
                        order_id: order.id.clone(),
                        product_id: product_id.clone(),
                        cause,
                    });
                }
            }
        }

        Ok(order)
    }

    // 校验请求，并按商品汇总数量
    fn validate(user_id: &str, items: &[LineItem]) -> Result<Vec<(String, u32)>, ReservationError> {
        if user_id.trim().is_empty() {
            return Err(ReservationError::InvalidOrder("userId is required".to_string()));
        }
        if items.is_empty() {
            return Err(ReservationError::InvalidOrder("order has no items".to_string()));
        }
        if let Some(item) = items.iter().find(|item| item.quantity == 0) {
            return Err(ReservationError::InvalidOrder(format!(
                "quantity for product {} must be positive",
                item.product_id
            )));
        }
        requested_totals(items)
            .into_iter()
            .map(|(product_id, total)| {
                u32::try_from(total)
                    .map(|total| (product_id.to_string(), total))
                    .map_err(|_| {
                        ReservationError::InvalidOrder(format!("quantity for product {product_id} is too large"))
                    })
            })
            .collect()
    }

    pub async fn get_order(&self, id: &str) -> Result<Order, ReservationError> {
        self.orders
            .find_by_id(id)
            .await?
            .ok_or_else(|| ReservationError::OrderNotFound(id.to_string()))
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>, ReservationError> {
        self.orders.find_all().await
    }

    pub async fn confirm_order(&self, id: &str) -> Result<Order, ReservationError> {
        let order = self.orders.transition(id, OrderStatus::Confirmed).await?;
        tracing::info!(order_id = %id, "Order confirmed");
        Ok(order)
    }

    pub async fn cancel_order(&self, id: &str) -> Result<Order, ReservationError> {
        let order = self.orders.transition(id, OrderStatus::Cancelled).await?;
        tracing::info!(order_id = %id, "Order cancelled");
        Ok(order)
    }
}
