use crate::services::discovery::DiscoveryError;

/// 远程调用失败的原因
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchFailure {
    #[error("not found")]
    NotFound,
    #[error("transport error: {0}")]
    Transport(String),
}

/// 库存网关错误类型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Unresolved(#[from] DiscoveryError),
    #[error("Error fetching product {product_id}: {cause}")]
    ProductFetchFailed {
        product_id: String,
        cause: FetchFailure,
    },
    #[error("Error checking products availability: {0}")]
    AvailabilityCheckFailed(Box<GatewayError>),
    #[error("Insufficient stock for product {product_id}: requested {requested}")]
    InsufficientStock { product_id: String, requested: u32 },
    #[error("Error updating stock of product {product_id}: {cause}")]
    StockUpdateFailed {
        product_id: String,
        cause: FetchFailure,
    },
}

impl GatewayError {
    // 去掉 AvailabilityCheckFailed 包装，得到最初的失败
    pub fn root(&self) -> &GatewayError {
        match self {
            GatewayError::AvailabilityCheckFailed(inner) => inner.root(),
            other => other,
        }
    }
}
