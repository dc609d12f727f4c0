use opizontas_registry::config::{Config, ServiceRole};
use opizontas_registry::server;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    server::init_tracing();
    let config = Config::load(ServiceRole::Catalogue)?;
    tracing::info!("Starting catalogue service...");
    server::start_catalogue(config).await?;
    Ok(())
}
