//! Typed decoding of registration payloads.
//!
//! Two shapes are accepted: the versioned `v1` descriptor and the legacy
//! Eureka envelope (`{"instance": {...}}`) sent by existing clients. Anything
//! else is rejected instead of being stored as partial data.

use serde::Deserialize;
use serde_json::Value;

use super::error::RegistryError;
use super::types::ServiceInstance;

pub const DESCRIPTOR_VERSION: u32 = 1;

// 解码后的实例描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceDescriptor {
    pub instance_id: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescriptorV1 {
    version: u32,
    instance_id: String,
    host: String,
    port: u16,
    app: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EurekaEnvelope {
    instance: EurekaInstance,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EurekaInstance {
    instance_id: Option<String>,
    app: Option<String>,
    host_name: String,
    port: EurekaPort,
}

#[derive(Debug, Deserialize)]
struct EurekaPort {
    #[serde(rename = "$")]
    value: PortValue,
}

// eureka 客户端有时把端口写成字符串
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u64),
    Text(String),
}

impl PortValue {
    fn to_port(&self) -> Result<u16, RegistryError> {
        let raw = match self {
            PortValue::Number(n) => *n,
            PortValue::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| RegistryError::MalformedDescriptor(format!("invalid port: {s:?}")))?,
        };
        u16::try_from(raw)
            .map_err(|_| RegistryError::MalformedDescriptor(format!("port out of range: {raw}")))
    }
}

impl InstanceDescriptor {
    /// Decodes a registration body for `app_id`.
    pub fn decode(app_id: &str, body: &[u8]) -> Result<Self, RegistryError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| RegistryError::MalformedDescriptor(format!("invalid JSON: {e}")))?;

        let (descriptor, body_app) = if value.get("instance").is_some() {
            let envelope: EurekaEnvelope = serde_json::from_value(value)
                .map_err(|e| RegistryError::MalformedDescriptor(e.to_string()))?;
            let instance = envelope.instance;
            let port = instance.port.value.to_port()?;
            let instance_id = instance
                .instance_id
                .unwrap_or_else(|| instance.host_name.clone());
            (
                Self {
                    instance_id,
                    host: instance.host_name,
                    port,
                },
                instance.app,
            )
        } else if value.get("version").is_some() {
            let v1: DescriptorV1 = serde_json::from_value(value)
                .map_err(|e| RegistryError::MalformedDescriptor(e.to_string()))?;
            if v1.version != DESCRIPTOR_VERSION {
                return Err(RegistryError::MalformedDescriptor(format!(
                    "unsupported descriptor version {}",
                    v1.version
                )));
            }
            (
                Self {
                    instance_id: v1.instance_id,
                    host: v1.host,
                    port: v1.port,
                },
                v1.app,
            )
        } else {
            return Err(RegistryError::MalformedDescriptor(
                "expected an `instance` envelope or a versioned descriptor".to_string(),
            ));
        };

        if let Some(body_app) = body_app {
            if !body_app.eq_ignore_ascii_case(app_id) {
                return Err(RegistryError::MalformedDescriptor(format!(
                    "descriptor app {body_app:?} does not match path app {app_id:?}"
                )));
            }
        }

        descriptor.validate()?;
        Ok(descriptor)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if self.instance_id.trim().is_empty() {
            return Err(RegistryError::MalformedDescriptor("empty instanceId".to_string()));
        }
        if self.host.trim().is_empty() {
            return Err(RegistryError::MalformedDescriptor("empty host".to_string()));
        }
        if self.port == 0 {
            return Err(RegistryError::MalformedDescriptor("port must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn into_instance(self, app_id: &str) -> ServiceInstance {
        ServiceInstance::new(app_id, self.instance_id, self.host, self.port)
    }
}
