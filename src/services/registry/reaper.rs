use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::service::RegistryStore;

// 过期清理任务配置
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    pub eviction_interval: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            eviction_interval: Duration::from_secs(30),
        }
    }
}

/// Handle to the background expiry sweep. Dropping the handle does not stop
/// the task; call [`ReaperHandle::shutdown`].
#[derive(Debug)]
pub struct ReaperHandle {
    cancel: CancellationToken,
    task_tracker: TaskTracker,
}

pub struct ExpiryReaper;

impl ExpiryReaper {
    // 启动清理任务
    pub fn spawn(store: RegistryStore, config: ReaperConfig) -> ReaperHandle {
        let cancel = CancellationToken::new();
        let task_tracker = TaskTracker::new();
        let token = cancel.clone();

        task_tracker.spawn(async move {
            let mut interval = tokio::time::interval(config.eviction_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval 的第一次 tick 立即完成
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!("Expiry reaper cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        tracing::debug!("Executing service expiration check...");
                        Self::sweep(&store);
                    }
                }
            }
        });
        task_tracker.close();

        ReaperHandle {
            cancel,
            task_tracker,
        }
    }

    // 单次清理
    pub fn sweep(store: &RegistryStore) -> Vec<(String, String)> {
        let evicted = store.evict_expired();
        if evicted.is_empty() {
            tracing::debug!(applications = store.application_count(), "Cleanup check completed, nothing expired");
        } else {
            tracing::info!(
                expired_count = evicted.len(),
                timeout_secs = store.expiry_threshold().as_secs(),
                "Cleanup check completed, removed expired instances"
            );
        }
        evicted
    }
}

impl ReaperHandle {
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.task_tracker.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.task_tracker.is_empty()
    }
}
