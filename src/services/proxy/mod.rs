//! Edge proxy: forwards `/api/...` prefixes to backing services located
//! through discovery.

pub mod error;
pub mod forwarder;
pub mod http_impl;

pub use error::ProxyError;
pub use forwarder::{ApiProxy, ProxyRoute};
