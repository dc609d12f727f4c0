use thiserror::Error;

/// Errors that can occur during catalogue operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogueError {
    /// The requested product was not found.
    #[error("Product with id {0} not found")]
    NotFound(String),

    /// The stock change would drive stock below zero.
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u64, available: u32 },

    /// The product data provided is invalid.
    #[error("Product validation error: {0}")]
    Validation(String),
}
