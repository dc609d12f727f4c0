use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::services::discovery::Endpoint;
use crate::services::proxy::ProxyRoute;

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// 进程角色，决定 PORT 等环境变量作用于哪一段配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceRole {
    Registry,
    Catalogue,
    Orders,
    Proxy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub discovery: DiscoveryConfig,
    pub inventory: InventoryConfig,
    pub instance: InstanceConfig,
    pub catalogue: ServiceConfig,
    pub orders: ServiceConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub host: String,
    pub port: u16,
    /// 清理间隔（秒）
    pub eviction_interval_secs: u64,
    /// 心跳过期阈值（秒）
    pub expiry_threshold_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8761,
            eviction_interval_secs: 30,
            expiry_threshold_secs: 90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// 注册中心地址
    pub registry_url: String,
    pub request_timeout_ms: u64,
    /// 应用名 -> 静态地址（"host:port" 或 "http://host:port"）
    pub fallbacks: HashMap<String, String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            registry_url: "http://eureka-server:8761".to_string(),
            request_timeout_ms: 2000,
            fallbacks: HashMap::from([
                ("catalogue-service".to_string(), "http://catalogue:3001".to_string()),
                ("commande-service".to_string(), "http://commande:3002".to_string()),
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub catalogue_app_id: String,
    pub request_timeout_ms: u64,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            catalogue_app_id: "catalogue-service".to_string(),
            request_timeout_ms: 5000,
        }
    }
}

// 本实例向注册中心注册时使用的信息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    pub enabled: bool,
    pub host: String,
    pub heartbeat_interval_secs: u64,
    pub retry_delay_ms: u64,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "localhost".to_string(),
            heartbeat_interval_secs: 30,
            retry_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub app_id: String,
    pub host: String,
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            host: "0.0.0.0".to_string(),
            port: 0,
        }
    }
}

// API 网关
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub app_id: String,
    pub host: String,
    pub port: u16,
    /// 转发请求超时
    pub request_timeout_ms: u64,
    pub routes: Vec<ProxyRoute>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            app_id: "api-gateway".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            request_timeout_ms: 10000,
            routes: vec![
                ProxyRoute::new("/api/products", "catalogue-service", "/products"),
                ProxyRoute::new("/api/orders", "commande-service", "/orders"),
            ],
        }
    }
}

// 兼容原有部署使用的环境变量
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    port: Option<u16>,
    eureka_host: Option<String>,
    eureka_port: Option<u16>,
    app_host: Option<String>,
    catalogue_service_url: Option<String>,
}

impl Config {
    /// Loads `config.toml` (or `$CONFIG_PATH`), then applies `.env` and the
    /// deployment environment variables for `role`.
    pub fn load(role: ServiceRole) -> Result<Self, ConfigError> {
        // .env 不存在时忽略
        let _ = dotenvy::dotenv();

        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        let mut config = if Path::new(&path).exists() {
            Self::from_toml(&fs::read_to_string(&path)?)?
        } else {
            tracing::debug!(path = %path, "Config file not found, using defaults");
            Self::default()
        };

        let overrides: EnvOverrides = envy::from_env()?;
        config.apply_overrides(role, overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(raw)?;
        config.fill_service_defaults();
        Ok(config)
    }

    fn fill_service_defaults(&mut self) {
        if self.catalogue.app_id.is_empty() {
            self.catalogue.app_id = "catalogue-service".to_string();
        }
        if self.catalogue.port == 0 {
            self.catalogue.port = 3001;
        }
        if self.orders.app_id.is_empty() {
            self.orders.app_id = "commande-service".to_string();
        }
        if self.orders.port == 0 {
            self.orders.port = 3002;
        }
    }

    fn apply_overrides(&mut self, role: ServiceRole, overrides: EnvOverrides) {
        self.fill_service_defaults();

        if let Some(port) = overrides.port {
            match role {
                ServiceRole::Registry => self.registry.port = port,
                ServiceRole::Catalogue => self.catalogue.port = port,
                ServiceRole::Orders => self.orders.port = port,
                ServiceRole::Proxy => self.proxy.port = port,
            }
        }
        if overrides.eureka_host.is_some() || overrides.eureka_port.is_some() {
            let host = overrides.eureka_host.unwrap_or_else(|| "eureka-server".to_string());
            let port = overrides.eureka_port.unwrap_or(8761);
            self.discovery.registry_url = format!("http://{host}:{port}");
        }
        if let Some(app_host) = overrides.app_host {
            self.instance.host = app_host;
        }
        if let Some(url) = overrides.catalogue_service_url {
            self.discovery
                .fallbacks
                .insert(self.inventory.catalogue_app_id.clone(), url);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.eviction_interval_secs == 0 {
            return Err(ConfigError::Invalid("registry.eviction_interval_secs must be positive".into()));
        }
        if self.registry.expiry_threshold_secs == 0 {
            return Err(ConfigError::Invalid("registry.expiry_threshold_secs must be positive".into()));
        }
        if self.instance.heartbeat_interval_secs == 0 {
            return Err(ConfigError::Invalid("instance.heartbeat_interval_secs must be positive".into()));
        }
        if self.inventory.request_timeout_ms == 0
            || self.discovery.request_timeout_ms == 0
            || self.proxy.request_timeout_ms == 0
        {
            return Err(ConfigError::Invalid("request timeouts must be positive".into()));
        }
        self.fallback_endpoints()?;
        Ok(())
    }

    pub fn fallback_endpoints(&self) -> Result<HashMap<String, Endpoint>, ConfigError> {
        self.discovery
            .fallbacks
            .iter()
            .map(|(app_id, raw)| {
                raw.parse::<Endpoint>()
                    .map(|endpoint| (app_id.clone(), endpoint))
                    .map_err(|e| ConfigError::Invalid(format!("discovery.fallbacks.{app_id}: {e}")))
            })
            .collect()
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.registry.eviction_interval_secs)
    }

    pub fn expiry_threshold(&self) -> Duration {
        Duration::from_secs(self.registry.expiry_threshold_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.instance.heartbeat_interval_secs)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery.request_timeout_ms)
    }

    pub fn inventory_timeout(&self) -> Duration {
        Duration::from_millis(self.inventory.request_timeout_ms)
    }

    pub fn proxy_timeout(&self) -> Duration {
        Duration::from_millis(self.proxy.request_timeout_ms)
    }
}
