use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ReservationError;
use crate::services::inventory::LineItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Cancelled,
}

/// An order as persisted by the order store. `total_amount` is fixed when the
/// order is created and is never recomputed from live prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub items: Vec<LineItem>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(id: String, user_id: String, items: Vec<LineItem>, total_amount: f64) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            items,
            total_amount,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves a `PENDING` order to `to`. Terminal orders, and moves back to
    /// `PENDING`, are rejected.
    pub fn transition(&mut self, to: OrderStatus) -> Result<(), ReservationError> {
        if self.status != OrderStatus::Pending || to == OrderStatus::Pending {
            return Err(ReservationError::InvalidTransition {
                order_id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: String,
    pub items: Vec<LineItem>,
}
