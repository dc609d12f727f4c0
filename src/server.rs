use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::services::catalogue::{self, CatalogueStore};
use crate::services::discovery::{
    AgentConfig, AgentHandle, DiscoveryClient, EurekaHttpSource, RegistrationAgent,
};
use crate::services::inventory::{CatalogueGateway, GatewayConfig};
use crate::services::proxy::{self, ApiProxy};
use crate::services::registry::{self, ExpiryReaper, ReaperConfig, RegistryStore};
use crate::services::reservation::{self, InMemoryOrderStore, ReservationWorkflow};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Initializes `tracing` with `RUST_LOG` filtering, defaulting to `info`.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

// 注册中心：HTTP 接口 + 过期清理任务
pub async fn start_registry(config: Config) -> Result<(), BoxError> {
    let addr = format!("{}:{}", config.registry.host, config.registry.port);

    // 初始化服务注册表
    let store = RegistryStore::new(config.expiry_threshold());
    let reaper = ExpiryReaper::spawn(
        store.clone(),
        ReaperConfig {
            eviction_interval: config.eviction_interval(),
        },
    );

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        address = %addr,
        eviction_interval_secs = config.registry.eviction_interval_secs,
        expiry_threshold_secs = config.registry.expiry_threshold_secs,
        "Registry server listening"
    );

    let served = axum::serve(listener, registry::http_impl::router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // 先停止清理任务再释放注册表
    reaper.shutdown().await;
    served?;
    Ok(())
}

pub async fn start_catalogue(config: Config) -> Result<(), BoxError> {
    let addr = format!("{}:{}", config.catalogue.host, config.catalogue.port);
    let store = CatalogueStore::new();

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Catalogue service listening");

    let agent = spawn_agent(&config, &config.catalogue.app_id, config.catalogue.port)?;
    let served = axum::serve(listener, catalogue::http_impl::router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(agent) = agent {
        agent.shutdown().await;
    }
    served?;
    Ok(())
}

pub async fn start_orders(config: Config) -> Result<(), BoxError> {
    let addr = format!("{}:{}", config.orders.host, config.orders.port);

    let source = EurekaHttpSource::new(config.discovery.registry_url.clone(), config.discovery_timeout())?;
    let discovery = DiscoveryClient::new(Arc::new(source), config.fallback_endpoints()?);
    let gateway = CatalogueGateway::new(
        discovery,
        GatewayConfig {
            catalogue_app_id: config.inventory.catalogue_app_id.clone(),
            request_timeout: config.inventory_timeout(),
        },
    )?;
    let workflow = ReservationWorkflow::new(Arc::new(gateway), Arc::new(InMemoryOrderStore::new()));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        address = %addr,
        registry_url = %config.discovery.registry_url,
        "Order service listening"
    );

    let agent = spawn_agent(&config, &config.orders.app_id, config.orders.port)?;
    let served = axum::serve(listener, reservation::http_impl::router(workflow))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(agent) = agent {
        agent.shutdown().await;
    }
    served?;
    Ok(())
}

// API 网关：按前缀转发到目录服务和订单服务
pub async fn start_proxy(config: Config) -> Result<(), BoxError> {
    let addr = format!("{}:{}", config.proxy.host, config.proxy.port);

    let source = EurekaHttpSource::new(config.discovery.registry_url.clone(), config.discovery_timeout())?;
    let discovery = DiscoveryClient::new(Arc::new(source), config.fallback_endpoints()?);
    let api_proxy = ApiProxy::new(discovery, config.proxy.routes.clone(), config.proxy_timeout())?;

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        address = %addr,
        routes = config.proxy.routes.len(),
        "API gateway listening"
    );

    let agent = spawn_agent(&config, &config.proxy.app_id, config.proxy.port)?;
    let served = axum::serve(listener, proxy::http_impl::router(api_proxy))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(agent) = agent {
        agent.shutdown().await;
    }
    served?;
    Ok(())
}

fn spawn_agent(config: &Config, app_id: &str, port: u16) -> Result<Option<AgentHandle>, BoxError> {
    if !config.instance.enabled {
        return Ok(None);
    }
    let agent = RegistrationAgent::new(AgentConfig {
        registry_url: config.discovery.registry_url.clone(),
        app_id: app_id.to_string(),
        instance_id: format!("{}:{}", config.instance.host, port),
        host: config.instance.host.clone(),
        port,
        heartbeat_interval: config.heartbeat_interval(),
        retry_delay: std::time::Duration::from_millis(config.instance.retry_delay_ms),
        request_timeout: config.discovery_timeout(),
    })?;
    Ok(Some(agent.spawn()))
}
