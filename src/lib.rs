//! Service registry and inventory reservation core.
//!
//! - [`services::registry`]: Eureka-compatible registry store, expiry reaper and HTTP surface
//! - [`services::discovery`]: endpoint resolution with static fallback, registration agent
//! - [`services::inventory`]: gateway to the catalogue service
//! - [`services::reservation`]: order creation workflow and order store
//! - [`services::catalogue`]: product store and the catalogue HTTP API
//! - [`services::proxy`]: `/api/...` edge proxy over discovery

pub mod config;
pub mod server;
pub mod services;
