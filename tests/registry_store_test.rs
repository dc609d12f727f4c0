use std::time::Duration;

use opizontas_registry::services::registry::{
    ExpiryReaper, ReaperConfig, RegistryError, RegistryStore, ServiceInstance,
};

const THRESHOLD: Duration = Duration::from_secs(90);

fn instance(id: &str, port: u16) -> ServiceInstance {
    ServiceInstance::new("catalogue-service", id, "10.0.0.1", port)
}

#[tokio::test]
async fn test_reregistration_keeps_single_entry() {
    let store = RegistryStore::new(THRESHOLD);

    store.register("catalogue-service", instance("catalogue-1", 3001));
    store.register("catalogue-service", instance("catalogue-1", 3005));

    let instances = store.lookup("catalogue-service");
    assert_eq!(instances.len(), 1);
    // 重复注册覆盖元数据
    assert_eq!(instances[0].port, 3005);
}

#[tokio::test]
async fn test_register_sets_app_id_from_path() {
    let store = RegistryStore::new(THRESHOLD);
    store.register("billing", instance("billing-1", 4000));

    let instances = store.lookup("billing");
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].app_id, "billing");
    assert!(store.lookup("catalogue-service").is_empty());
}

#[tokio::test]
async fn test_lookup_preserves_registration_order() {
    let store = RegistryStore::new(THRESHOLD);
    store.register("catalogue-service", instance("catalogue-1", 3001));
    store.register("catalogue-service", instance("catalogue-2", 3002));
    store.register("catalogue-service", instance("catalogue-1", 3001));

    let ids: Vec<String> = store
        .lookup("catalogue-service")
        .into_iter()
        .map(|i| i.instance_id)
        .collect();
    assert_eq!(ids, vec!["catalogue-1", "catalogue-2"]);
}

#[tokio::test]
async fn test_heartbeat_unknown_instance() {
    let store = RegistryStore::new(THRESHOLD);

    let err = store.heartbeat("catalogue-service", "catalogue-1").unwrap_err();
    assert!(matches!(err, RegistryError::InstanceNotFound { .. }));

    store.register("catalogue-service", instance("catalogue-1", 3001));
    let err = store.heartbeat("catalogue-service", "catalogue-2").unwrap_err();
    assert_eq!(
        err,
        RegistryError::InstanceNotFound {
            app_id: "catalogue-service".to_string(),
            instance_id: "catalogue-2".to_string(),
        }
    );
    assert!(store.heartbeat("catalogue-service", "catalogue-1").is_ok());
}

#[tokio::test]
async fn test_deregister_last_instance_removes_application() {
    let store = RegistryStore::new(THRESHOLD);
    store.register("catalogue-service", instance("catalogue-1", 3001));
    store.register("catalogue-service", instance("catalogue-2", 3002));

    store.deregister("catalogue-service", "catalogue-1").unwrap();
    assert_eq!(store.application_count(), 1);

    store.deregister("catalogue-service", "catalogue-2").unwrap();
    assert_eq!(store.application_count(), 0);
    assert!(store.applications().is_empty());

    let err = store.deregister("catalogue-service", "catalogue-2").unwrap_err();
    assert!(matches!(err, RegistryError::InstanceNotFound { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_lookup_hides_stale_instances_before_sweep() {
    let store = RegistryStore::new(THRESHOLD);
    store.register("catalogue-service", instance("catalogue-1", 3001));

    tokio::time::advance(Duration::from_secs(60)).await;
    store.register("catalogue-service", instance("catalogue-2", 3002));

    tokio::time::advance(Duration::from_secs(31)).await;
    // catalogue-1 已经 91 秒没有心跳，尚未被清理但不可见
    let ids: Vec<String> = store
        .lookup("catalogue-service")
        .into_iter()
        .map(|i| i.instance_id)
        .collect();
    assert_eq!(ids, vec!["catalogue-2"]);
    assert_eq!(store.application_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_evict_expired_removes_empty_application() {
    let store = RegistryStore::new(THRESHOLD);
    store.register("catalogue-service", instance("catalogue-1", 3001));
    store.register("billing", ServiceInstance::new("billing", "billing-1", "10.0.0.2", 4000));

    tokio::time::advance(Duration::from_secs(50)).await;
    store.heartbeat("billing", "billing-1").unwrap();

    tokio::time::advance(Duration::from_secs(41)).await;
    let evicted = ExpiryReaper::sweep(&store);

    assert_eq!(
        evicted,
        vec![("catalogue-service".to_string(), "catalogue-1".to_string())]
    );
    assert_eq!(store.application_count(), 1);
    assert!(store.lookup("catalogue-service").is_empty());
    assert_eq!(store.lookup("billing").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_exactly_threshold_is_not_expired() {
    let store = RegistryStore::new(THRESHOLD);
    store.register("catalogue-service", instance("catalogue-1", 3001));

    tokio::time::advance(THRESHOLD).await;
    assert!(ExpiryReaper::sweep(&store).is_empty());
    assert_eq!(store.lookup("catalogue-service").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reaper_task_evicts_silent_instance() {
    let store = RegistryStore::new(THRESHOLD);
    let reaper = ExpiryReaper::spawn(
        store.clone(),
        ReaperConfig {
            eviction_interval: Duration::from_secs(30),
        },
    );

    store.register("catalogue-service", instance("catalogue-1", 3001));
    store.register("billing", ServiceInstance::new("billing", "billing-1", "10.0.0.2", 4000));

    // billing 持续发送心跳
    for _ in 0..4 {
        tokio::time::sleep(Duration::from_secs(30)).await;
        store.heartbeat("billing", "billing-1").unwrap();
    }
    // 120 秒处的清理已经执行
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(store.application_count(), 1);
    assert!(store.lookup("catalogue-service").is_empty());
    assert_eq!(store.lookup("billing").len(), 1);

    assert!(reaper.is_running());
    reaper.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_reaper_shutdown_stops_sweeping() {
    let store = RegistryStore::new(THRESHOLD);
    let reaper = ExpiryReaper::spawn(store.clone(), ReaperConfig::default());
    reaper.shutdown().await;

    store.register("catalogue-service", instance("catalogue-1", 3001));
    tokio::time::sleep(Duration::from_secs(300)).await;

    // 清理任务已停止，记录仍在表中，只是读取时被过滤
    assert_eq!(store.application_count(), 1);
    assert!(store.lookup("catalogue-service").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_sweep_uses_configured_threshold() {
    let store = RegistryStore::new(Duration::from_secs(10));
    assert_eq!(store.expiry_threshold(), Duration::from_secs(10));
    store.register("catalogue-service", instance("catalogue-1", 3001));

    tokio::time::advance(Duration::from_secs(11)).await;
    assert_eq!(ExpiryReaper::sweep(&store).len(), 1);
    assert_eq!(store.application_count(), 0);
}
