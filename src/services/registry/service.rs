use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::error::RegistryError;
use super::types::{Application, ServiceInstance, ServiceRegistry};

/// In-memory registry table keyed by application name.
///
/// Cloning yields another handle to the same table. Mutations of one
/// application hold that entry's write lock, so register, heartbeat,
/// deregister and eviction never interleave for the same `app_id`.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    registry: ServiceRegistry,
    expiry_threshold: Duration,
}

impl RegistryStore {
    pub fn new(expiry_threshold: Duration) -> Self {
        Self {
            registry: Arc::new(DashMap::new()),
            expiry_threshold,
        }
    }

    pub fn expiry_threshold(&self) -> Duration {
        self.expiry_threshold
    }

    // 注册或覆盖实例
    pub fn register(&self, app_id: &str, mut instance: ServiceInstance) {
        instance.app_id = app_id.to_string();
        instance.touch();

        let mut instances = self.registry.entry(app_id.to_string()).or_default();
        match instances
            .iter_mut()
            .find(|existing| existing.instance_id == instance.instance_id)
        {
            Some(existing) => {
                tracing::info!(
                    app_id = %app_id,
                    instance_id = %instance.instance_id,
                    address = %instance.authority(),
                    "Re-registered service instance"
                );
                *existing = instance;
            }
            None => {
                tracing::info!(
                    app_id = %app_id,
                    instance_id = %instance.instance_id,
                    address = %instance.authority(),
                    "Registered service instance"
                );
                instances.push(instance);
            }
        }
    }

    // 更新心跳
    pub fn heartbeat(&self, app_id: &str, instance_id: &str) -> Result<(), RegistryError> {
        let not_found = || RegistryError::InstanceNotFound {
            app_id: app_id.to_string(),
            instance_id: instance_id.to_string(),
        };

        let mut instances = self.registry.get_mut(app_id).ok_or_else(not_found)?;
        let instance = instances
            .iter_mut()
            .find(|i| i.instance_id == instance_id)
            .ok_or_else(not_found)?;
        instance.touch();

        tracing::debug!(app_id = %app_id, instance_id = %instance_id, "Heartbeat received");
        Ok(())
    }

    // 注销实例，最后一个实例被移除时同时移除应用
    pub fn deregister(&self, app_id: &str, instance_id: &str) -> Result<ServiceInstance, RegistryError> {
        let not_found = || RegistryError::InstanceNotFound {
            app_id: app_id.to_string(),
            instance_id: instance_id.to_string(),
        };

        let removed = {
            let mut instances = self.registry.get_mut(app_id).ok_or_else(not_found)?;
            let position = instances
                .iter()
                .position(|i| i.instance_id == instance_id)
                .ok_or_else(not_found)?;
            instances.remove(position)
        };
        self.registry.remove_if(app_id, |_, instances| instances.is_empty());

        tracing::info!(app_id = %app_id, instance_id = %instance_id, "Deregistered service instance");
        Ok(removed)
    }

    /// Live instances of `app_id`, in registration order. Stale entries that
    /// the reaper has not swept yet are filtered out here.
    pub fn lookup(&self, app_id: &str) -> Vec<ServiceInstance> {
        let now = Instant::now();
        self.registry
            .get(app_id)
            .map(|instances| {
                instances
                    .iter()
                    .filter(|i| !i.is_expired(now, self.expiry_threshold))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    // 所有应用的快照，按名称排序
    pub fn applications(&self) -> Vec<Application> {
        let now = Instant::now();
        let mut applications: Vec<Application> = self
            .registry
            .iter()
            .filter_map(|entry| {
                let instances: Vec<ServiceInstance> = entry
                    .value()
                    .iter()
                    .filter(|i| !i.is_expired(now, self.expiry_threshold))
                    .cloned()
                    .collect();
                (!instances.is_empty()).then(|| Application {
                    name: entry.key().clone(),
                    instances,
                })
            })
            .collect();
        applications.sort_by(|a, b| a.name.cmp(&b.name));
        applications
    }

    pub fn application(&self, app_id: &str) -> Result<Application, RegistryError> {
        let instances = self.lookup(app_id);
        if instances.is_empty() {
            return Err(RegistryError::ApplicationNotFound(app_id.to_string()));
        }
        Ok(Application {
            name: app_id.to_string(),
            instances,
        })
    }

    /// Removes every instance whose heartbeat is older than the threshold and
    /// returns the evicted `(app_id, instance_id)` pairs.
    pub fn evict_expired(&self) -> Vec<(String, String)> {
        let app_ids: Vec<String> = self.registry.iter().map(|entry| entry.key().clone()).collect();
        let mut evicted = Vec::new();

        for app_id in app_ids {
            if let Some(mut instances) = self.registry.get_mut(&app_id) {
                // 持有写锁时重新判断，避免吞掉清理过程中到达的心跳
                let now = Instant::now();
                instances.retain(|instance| {
                    if instance.is_expired(now, self.expiry_threshold) {
                        tracing::warn!(
                            app_id = %app_id,
                            instance_id = %instance.instance_id,
                            elapsed_secs = instance.age(now).as_secs(),
                            timeout_secs = self.expiry_threshold.as_secs(),
                            "Service instance expired due to heartbeat timeout, removing from registry"
                        );
                        evicted.push((app_id.clone(), instance.instance_id.clone()));
                        false
                    } else {
                        true
                    }
                });
            }

            if self
                .registry
                .remove_if(&app_id, |_, instances| instances.is_empty())
                .is_some()
            {
                tracing::info!(app_id = %app_id, "Application has no live instances, removed mapping");
            }
        }

        evicted
    }

    pub fn application_count(&self) -> usize {
        self.registry.len()
    }
}
