pub mod error;
pub mod gateway;
pub mod types;

pub use error::{FetchFailure, GatewayError};
pub use gateway::{CatalogueGateway, GatewayConfig, InventoryGateway};
pub use types::{LineItem, Product, StockDelta, requested_totals};
