pub mod agent;
pub mod client;
pub mod error;
pub mod source;

pub use agent::{AgentConfig, AgentHandle, RegistrationAgent};
pub use client::{DiscoveryClient, Endpoint, EndpointSource, ResolvedEndpoint};
pub use error::{AgentError, DiscoveryError};
pub use source::{EurekaHttpSource, RegistrySource};
