use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::error::DiscoveryError;
use super::source::RegistrySource;

// 解析来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointSource {
    Registry,
    Fallback,
}

/// A resolved `host:port` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// 接受 "host:port" 或 "http://host:port/"
impl FromStr for Endpoint {
    type Err = DiscoveryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || DiscoveryError::InvalidEndpoint(raw.to_string());
        let authority = raw
            .trim()
            .trim_start_matches("http://")
            .trim_end_matches('/');
        let (host, port) = authority.rsplit_once(':').ok_or_else(invalid)?;
        let port: u16 = port.parse().map_err(|_| invalid())?;
        if host.is_empty() || host.contains('/') || port == 0 {
            return Err(invalid());
        }
        Ok(Self::new(host, port))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub endpoint: Endpoint,
    pub source: EndpointSource,
}

/// Resolves application names to endpoints: live registry data first, then
/// the static fallback table.
#[derive(Clone)]
pub struct DiscoveryClient {
    source: Arc<dyn RegistrySource>,
    fallbacks: HashMap<String, Endpoint>,
}

impl fmt::Debug for DiscoveryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryClient")
            .field("fallbacks", &self.fallbacks)
            .finish_non_exhaustive()
    }
}

impl DiscoveryClient {
    pub fn new(source: Arc<dyn RegistrySource>, fallbacks: HashMap<String, Endpoint>) -> Self {
        Self { source, fallbacks }
    }

    pub async fn resolve(&self, app_id: &str) -> Result<Endpoint, DiscoveryError> {
        self.resolve_with_source(app_id).await.map(|r| r.endpoint)
    }

    pub async fn resolve_with_source(&self, app_id: &str) -> Result<ResolvedEndpoint, DiscoveryError> {
        match self.source.lookup(app_id).await {
            Ok(endpoints) => {
                if let Some(endpoint) = endpoints.into_iter().next() {
                    tracing::debug!(app_id = %app_id, endpoint = %endpoint, "Resolved service from registry");
                    return Ok(ResolvedEndpoint {
                        endpoint,
                        source: EndpointSource::Registry,
                    });
                }
                tracing::debug!(app_id = %app_id, "No live instance in registry");
            }
            Err(e) => {
                tracing::warn!(
                    app_id = %app_id,
                    error = %e,
                    "Error getting service from registry, using fallback endpoint"
                );
            }
        }

        match self.fallbacks.get(app_id) {
            Some(endpoint) => {
                tracing::debug!(app_id = %app_id, endpoint = %endpoint, "Resolved service from fallback table");
                Ok(ResolvedEndpoint {
                    endpoint: endpoint.clone(),
                    source: EndpointSource::Fallback,
                })
            }
            None => Err(DiscoveryError::ServiceUnresolved(app_id.to_string())),
        }
    }
}
