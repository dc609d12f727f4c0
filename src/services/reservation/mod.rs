//! Order-side reservation logic: the workflow, the order model and the order
//! store it persists to.

pub mod error;
pub mod http_impl;
pub mod order;
pub mod store;
pub mod workflow;

pub use error::ReservationError;
pub use order::{CreateOrderRequest, Order, OrderStatus};
pub use store::{InMemoryOrderStore, OrderStore};
pub use workflow::ReservationWorkflow;
