use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::error::ReservationError;
use super::order::{Order, OrderStatus};

/// Order persistence used by the workflow.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, order: Order) -> Result<Order, ReservationError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, ReservationError>;
    async fn find_all(&self) -> Result<Vec<Order>, ReservationError>;
    /// Applies [`Order::transition`] to the stored order as one atomic step,
    /// so two concurrent transitions cannot both leave `PENDING`.
    async fn transition(&self, id: &str, to: OrderStatus) -> Result<Order, ReservationError>;
}

// 内存订单存储，保持创建顺序
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<Vec<Order>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: Order) -> Result<Order, ReservationError> {
        let mut orders = self.orders.write().await;
        if orders.iter().any(|o| o.id == order.id) {
            return Err(ReservationError::Store(format!("order {} already exists", order.id)));
        }
        orders.push(order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, ReservationError> {
        Ok(self.orders.read().await.iter().find(|o| o.id == id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Order>, ReservationError> {
        Ok(self.orders.read().await.clone())
    }

    async fn transition(&self, id: &str, to: OrderStatus) -> Result<Order, ReservationError> {
        // 检查与写入在同一把写锁下完成
        let mut orders = self.orders.write().await;
        let order = orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| ReservationError::OrderNotFound(id.to_string()))?;
        order.transition(to)?;
        Ok(order.clone())
    }
}
