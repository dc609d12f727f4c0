pub mod catalogue;
pub mod discovery;
pub mod inventory;
pub mod proxy;
pub mod registry;
pub mod reservation;

pub use discovery::{DiscoveryClient, Endpoint};
pub use registry::{ExpiryReaper, RegistryStore, ServiceInstance};
pub use reservation::ReservationWorkflow;
