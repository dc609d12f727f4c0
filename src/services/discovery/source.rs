use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::client::Endpoint;
use super::error::DiscoveryError;
use crate::services::registry::RegistryStore;

/// Where the discovery client reads live registry data from.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Live endpoints for `app_id`, first-registered first. An empty vector
    /// means the registry has no entry; `Err` means it could not be asked.
    async fn lookup(&self, app_id: &str) -> Result<Vec<Endpoint>, DiscoveryError>;
}

// 进程内注册表
#[async_trait]
impl RegistrySource for RegistryStore {
    async fn lookup(&self, app_id: &str) -> Result<Vec<Endpoint>, DiscoveryError> {
        Ok(RegistryStore::lookup(self, app_id)
            .into_iter()
            .map(|instance| Endpoint::new(instance.host, instance.port))
            .collect())
    }
}

/// Reads the registry over `GET /eureka/apps/{appId}`.
#[derive(Debug, Clone)]
pub struct EurekaHttpSource {
    registry_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ApplicationEnvelope {
    application: ApplicationBody,
}

#[derive(Debug, Deserialize)]
struct ApplicationBody {
    #[serde(default)]
    instance: Vec<InstanceBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceBody {
    host_name: String,
    port: PortBody,
}

#[derive(Debug, Deserialize)]
struct PortBody {
    #[serde(rename = "$")]
    value: u16,
}

impl EurekaHttpSource {
    pub fn new(registry_url: impl Into<String>, timeout: Duration) -> Result<Self, DiscoveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DiscoveryError::RegistryUnreachable(e.to_string()))?;
        Ok(Self {
            registry_url: registry_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl RegistrySource for EurekaHttpSource {
    async fn lookup(&self, app_id: &str) -> Result<Vec<Endpoint>, DiscoveryError> {
        let url = format!("{}/eureka/apps/{}", self.registry_url, app_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DiscoveryError::RegistryUnreachable(e.to_string()))?;

        if response.status() == http::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(DiscoveryError::RegistryUnreachable(format!(
                "registry returned {}",
                response.status()
            )));
        }

        let envelope: ApplicationEnvelope = response
            .json()
            .await
            .map_err(|e| DiscoveryError::RegistryUnreachable(format!("invalid registry response: {e}")))?;

        Ok(envelope
            .application
            .instance
            .into_iter()
            .map(|instance| Endpoint::new(instance.host_name, instance.port.value))
            .collect())
    }
}
