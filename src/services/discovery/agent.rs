use serde_json::json;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::error::AgentError;
use crate::services::registry::descriptor::DESCRIPTOR_VERSION;

/// 注册代理配置
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// 注册中心地址
    pub registry_url: String,
    /// 本服务的应用名
    pub app_id: String,
    pub instance_id: String,
    pub host: String,
    pub port: u16,
    /// 心跳间隔
    pub heartbeat_interval: Duration,
    /// 注册失败后的重试间隔
    pub retry_delay: Duration,
    /// 单次请求超时
    pub request_timeout: Duration,
}

/// Client side of the registry protocol: registers this instance, keeps it
/// fresh with heartbeats and deregisters it on shutdown.
#[derive(Debug, Clone)]
pub struct RegistrationAgent {
    config: AgentConfig,
    client: reqwest::Client,
}

#[derive(Debug)]
pub struct AgentHandle {
    cancel: CancellationToken,
    task_tracker: TaskTracker,
}

impl RegistrationAgent {
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { config, client })
    }

    fn app_url(&self) -> String {
        format!(
            "{}/eureka/apps/{}",
            self.config.registry_url.trim_end_matches('/'),
            self.config.app_id
        )
    }

    fn instance_url(&self) -> String {
        format!("{}/{}", self.app_url(), self.config.instance_id)
    }

    pub async fn register(&self) -> Result<(), AgentError> {
        let body = json!({
            "version": DESCRIPTOR_VERSION,
            "app": self.config.app_id,
            "instanceId": self.config.instance_id,
            "host": self.config.host,
            "port": self.config.port,
        });
        let response = self.client.post(self.app_url()).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(AgentError::Rejected {
                operation: "register",
                status: response.status().as_u16(),
            });
        }
        tracing::info!(
            app_id = %self.config.app_id,
            instance_id = %self.config.instance_id,
            "Registered with service registry"
        );
        Ok(())
    }

    pub async fn heartbeat(&self) -> Result<(), AgentError> {
        let response = self.client.put(self.instance_url()).send().await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            http::StatusCode::NOT_FOUND => Err(AgentError::InstanceNotFound),
            status => Err(AgentError::Rejected {
                operation: "heartbeat",
                status: status.as_u16(),
            }),
        }
    }

    pub async fn deregister(&self) -> Result<(), AgentError> {
        let response = self.client.delete(self.instance_url()).send().await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            http::StatusCode::NOT_FOUND => Err(AgentError::InstanceNotFound),
            status => Err(AgentError::Rejected {
                operation: "deregister",
                status: status.as_u16(),
            }),
        }
    }

    // 启动注册与心跳任务
    pub fn spawn(self) -> AgentHandle {
        let cancel = CancellationToken::new();
        let task_tracker = TaskTracker::new();
        let token = cancel.clone();

        task_tracker.spawn(async move {
            if !self.register_until_success(&token).await {
                return;
            }

            let mut interval = tokio::time::interval(self.config.heartbeat_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        match self.heartbeat().await {
                            Ok(()) => tracing::debug!(app_id = %self.config.app_id, "Heartbeat sent"),
                            Err(AgentError::InstanceNotFound) => {
                                tracing::warn!(
                                    app_id = %self.config.app_id,
                                    instance_id = %self.config.instance_id,
                                    "Registry no longer knows this instance, re-registering"
                                );
                                if let Err(e) = self.register().await {
                                    tracing::warn!(error = %e, "Re-registration failed");
                                }
                            }
                            Err(e) => tracing::warn!(error = %e, "Heartbeat failed"),
                        }
                    }
                }
            }

            if let Err(e) = self.deregister().await {
                tracing::warn!(error = %e, "Deregistration on shutdown failed");
            } else {
                tracing::info!(app_id = %self.config.app_id, "Deregistered from service registry");
            }
        });
        task_tracker.close();

        AgentHandle {
            cancel,
            task_tracker,
        }
    }

    // 返回 false 表示在注册成功前被取消
    async fn register_until_success(&self, token: &CancellationToken) -> bool {
        loop {
            match self.register().await {
                Ok(()) => return true,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        retry_in_ms = self.config.retry_delay.as_millis() as u64,
                        "Registration failed, retrying"
                    );
                }
            }
            tokio::select! {
                _ = token.cancelled() => return false,
                _ = tokio::time::sleep(self.config.retry_delay) => {}
            }
        }
    }
}

impl AgentHandle {
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.task_tracker.wait().await;
    }
}
