use thiserror::Error;

use super::order::OrderStatus;
use crate::services::discovery::DiscoveryError;
use crate::services::inventory::FetchFailure;

/// Errors that can occur while creating or managing orders.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReservationError {
    /// The order request itself is invalid.
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// A line item's product could not be fetched from the catalogue.
    #[error("Error fetching product {product_id}: {cause}")]
    ProductFetchFailed {
        product_id: String,
        cause: FetchFailure,
    },

    /// The catalogue service could not be located.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(#[from] DiscoveryError),

    /// Observed stock is lower than the requested quantity; nothing was persisted.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: u32,
        available: u32,
    },

    /// The order was persisted but decrementing stock for a product failed.
    /// The order stays `PENDING`; items after `product_id` were not touched.
    #[error("Reservation failed for product {product_id} on order {order_id}")]
    ReservationFailed { order_id: String, product_id: String },

    /// The stock update call failed for a reason other than insufficient stock.
    #[error("Stock update failed for product {product_id} on order {order_id}: {cause}")]
    StockUpdateFailed {
        order_id: String,
        product_id: String,
        cause: FetchFailure,
    },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order {order_id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// An underlying order store error occurred.
    #[error("Order store error: {0}")]
    Store(String),
}
