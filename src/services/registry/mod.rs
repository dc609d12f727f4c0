//! Registry service module
//!
//! This module contains the service registry implementation split into logical components:
//! - `types`: Data structures and type definitions
//! - `descriptor`: Typed decoding of registration payloads
//! - `service`: Core store logic and methods
//! - `reaper`: Periodic eviction of silent instances
//! - `http_impl`: Eureka-compatible HTTP surface

pub mod descriptor;
pub mod error;
pub mod http_impl;
pub mod reaper;
pub mod service;
pub mod types;

// Re-export public types for easier access
pub use descriptor::InstanceDescriptor;
pub use error::RegistryError;
pub use reaper::{ExpiryReaper, ReaperConfig, ReaperHandle};
pub use service::RegistryStore;
pub use types::{Application, InstanceStatus, ServiceInstance, ServiceRegistry};
