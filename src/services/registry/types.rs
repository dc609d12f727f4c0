use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

// 实例状态，注册表只保存存活实例
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InstanceStatus {
    Up,
}

// 服务实例记录
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceInstance {
    pub app_id: String,
    pub instance_id: String,
    pub host: String,
    pub port: u16,
    pub status: InstanceStatus,
    // 单调时钟，用于判断过期
    pub last_heartbeat: Instant,
    // 墙上时间，仅用于对外展示
    pub last_updated: DateTime<Utc>,
}

impl ServiceInstance {
    pub fn new(app_id: impl Into<String>, instance_id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            app_id: app_id.into(),
            instance_id: instance_id.into(),
            host: host.into(),
            port,
            status: InstanceStatus::Up,
            last_heartbeat: Instant::now(),
            last_updated: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_heartbeat = Instant::now();
        self.last_updated = Utc::now();
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_heartbeat)
    }

    pub fn is_expired(&self, now: Instant, threshold: Duration) -> bool {
        self.age(now) > threshold
    }

    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Eureka-style rendering used by the `/eureka/apps` endpoints.
    pub fn to_eureka_json(&self) -> Value {
        json!({
            "instanceId": self.instance_id,
            "app": self.app_id,
            "hostName": self.host,
            "ipAddr": self.host,
            "port": { "$": self.port, "@enabled": "true" },
            "status": self.status,
            "lastUpdatedTimestamp": self.last_updated.timestamp_millis(),
        })
    }
}

// 应用名 -> 实例列表
pub type ServiceRegistry = Arc<DashMap<String, Vec<ServiceInstance>>>;

// 单个应用及其存活实例的快照
#[derive(Debug, Clone)]
pub struct Application {
    pub name: String,
    pub instances: Vec<ServiceInstance>,
}

impl Application {
    pub fn to_eureka_json(&self) -> Value {
        json!({
            "name": self.name,
            "instance": self.instances.iter().map(ServiceInstance::to_eureka_json).collect::<Vec<_>>(),
        })
    }
}
