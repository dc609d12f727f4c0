//! Catalogue side of the reservation flow: product storage and the HTTP API
//! the inventory gateway calls.

pub mod error;
pub mod http_impl;
pub mod store;

pub use error::CatalogueError;
pub use store::{
    AvailabilityRequest, CatalogueProduct, CatalogueStore, NewProduct, ProductFilter, ProductUpdate,
};
