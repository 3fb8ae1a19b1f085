//! epay-bridge - Cloudreve payment gateway bridge
//!
//! ```text
//! ┌───────────┐ purchase ┌──────────┐  form   ┌──────────┐
//! │ Cloudreve │─────────▶│  Bridge  │────────▶│  Payer   │
//! │           │◀─────────│ (store)  │◀────────│ Gateway  │
//! └───────────┘  notify  └──────────┘ callback└──────────┘
//! ```
//!
//! Usage: `epay_bridge [--env dev] [--port 4560]`

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use epay_bridge::config::{AppConfig, StoreDriver};
use epay_bridge::gateway::{self, AppState};
use epay_bridge::relay::HttpNotifier;
use epay_bridge::store::{KvStore, MemoryStore, OrderStore};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn KvStore>> {
    match config.store.driver {
        StoreDriver::Memory => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "redis-store")]
        StoreDriver::Redis => {
            let store = epay_bridge::store::RedisStore::connect(&config.store.redis)
                .await
                .with_context(|| format!("Failed to connect to Redis at {}", config.store.redis.server))?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis-store"))]
        StoreDriver::Redis => {
            anyhow::bail!("store.driver is redis but the redis-store feature is disabled")
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config =
        AppConfig::load(&env).with_context(|| format!("Failed to load config for env {}", env))?;
    let _log_guard = epay_bridge::logging::init_logging(&app_config);

    tracing::info!(
        env = %env,
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        "Starting epay bridge"
    );

    // 1. Session store
    let kv = open_store(&app_config).await?;
    tracing::info!(driver = kv.name(), "Session store ready");
    let orders = OrderStore::new(kv);

    // 2. Outbound notifier
    let notifier = HttpNotifier::new(Duration::from_secs(app_config.relay.request_timeout_secs))
        .context("Failed to build HTTP client")?;

    // 3. Shared state
    let state = AppState::new(&app_config, orders, Arc::new(notifier))
        .context("Failed to initialise gateway state")?;
    tracing::info!(
        base = %state.base,
        purchase_type = state.epay.purchase_type().as_str(),
        usdt = state.usdt.is_some(),
        v4_callback = state.v4_callback_enabled,
        "Gateway configured"
    );

    // 4. Serve, allowing --port override
    let port = get_port_override().unwrap_or(app_config.server.port);
    gateway::run_server(&app_config.server.host, port, Arc::new(state))
        .await
        .context("HTTP server failed")?;

    tracing::info!("Bridge stopped");
    Ok(())
}
