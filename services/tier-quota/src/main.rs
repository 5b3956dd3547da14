use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::serve;
use mindset_tier_quota::{
    create_router, ApiState, MemoryTierStore, StoreBackend, SystemClock, TierDatabase,
    TierQuotaConfig, TierQuotaManager, TierStore,
};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = TierQuotaConfig::from_env().context("failed to load configuration")?;
    init_tracing(&config);

    info!(
        host = %config.server_host,
        port = config.server_port,
        store = ?config.store_backend,
        free_limit = config.free_limit,
        premium_limit = config.premium_limit,
        fallback_limit = config.fallback_limit,
        "starting tier-quota service"
    );
    if config.effective_admin_token().is_none() {
        warn!("QUOTA_ADMIN_TOKEN is not set, admin routes accept unauthenticated requests");
    }

    let store = open_store(&config)?;
    let manager = Arc::new(TierQuotaManager::from_config(
        store,
        Arc::new(SystemClock),
        &config,
    ));

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .context("invalid server bind address")?;

    let state = Arc::new(ApiState::new(Arc::clone(&manager), config));
    let router = create_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind TCP listener")?;
    let local_addr = listener
        .local_addr()
        .context("failed to read bound address")?;
    info!(%local_addr, "tier-quota listening");

    serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server encountered an unrecoverable error")?;

    info!("tier-quota service shutting down");
    Ok(())
}

fn open_store(config: &TierQuotaConfig) -> Result<Arc<dyn TierStore>> {
    match config.store_backend {
        StoreBackend::Sqlite => {
            let database = TierDatabase::new(config.data_dir.clone())
                .context("failed to open tier database")?;
            info!(path = %database.path().display(), "opened tier database");
            Ok(Arc::new(database))
        }
        StoreBackend::Memory => {
            info!("using in-memory tier store, records will not survive restart");
            Ok(Arc::new(MemoryTierStore::new()))
        }
    }
}

fn init_tracing(config: &TierQuotaConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    fmt().with_env_filter(filter).with_target(false).compact().init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
