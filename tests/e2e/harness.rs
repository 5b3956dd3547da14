use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use axum::serve;
use mindset_tier_quota::{
    create_router, ApiState, Clock, FixedClock, StoreBackend, TierDatabase, TierQuotaConfig,
    TierQuotaManager, TierStore,
};
use rand::Rng;
use reqwest::Client;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

pub const ADMIN_TOKEN: &str = "e2e-admin-token";

/// In-process tier-quota server backed by a throwaway SQLite database.
pub struct TestHarness {
    pub temp_dir: TempDir,
    pub clock: Arc<FixedClock>,
    base_url: String,
    http_client: Client,
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
}

impl TestHarness {
    pub async fn start() -> Result<Self> {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(customize: impl FnOnce(&mut TierQuotaConfig)) -> Result<Self> {
        tracing_subscriber::fmt::try_init().ok();

        let temp_dir = TempDir::new().context("creating harness tempdir")?;
        let mut config = TierQuotaConfig {
            server_port: 0,
            data_dir: temp_dir.path().join("tiers"),
            store_backend: StoreBackend::Sqlite,
            free_limit: 2,
            premium_limit: 5,
            fallback_limit: 2,
            admin_token: Some(ADMIN_TOKEN.to_string()),
            ..TierQuotaConfig::default()
        };
        customize(&mut config);
        config.validate()?;

        let store: Arc<dyn TierStore> = Arc::new(
            TierDatabase::new(config.data_dir.clone()).context("opening harness database")?,
        );
        let clock = Arc::new(
            FixedClock::at_month(2024, 1).ok_or_else(|| anyhow!("invalid harness start month"))?,
        );
        let manager_clock: Arc<dyn Clock> = clock.clone();
        let manager = Arc::new(TierQuotaManager::from_config(store, manager_clock, &config));

        let listener = TcpListener::bind(("127.0.0.1", config.server_port))
            .await
            .context("binding harness listener")?;
        let addr = listener.local_addr().context("reading harness address")?;
        let router = create_router(Arc::new(ApiState::new(manager, config)));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            let result = serve(listener, router.into_make_service())
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await;
            if let Err(err) = result {
                debug!("harness server exited with error: {err}");
            }
        });

        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("building reqwest client")?;

        let harness = Self {
            temp_dir,
            clock,
            base_url: format!("http://{addr}"),
            http_client,
            shutdown: Some(shutdown_tx),
            server: Some(server),
        };
        harness.wait_for_health(Duration::from_secs(5)).await?;
        Ok(harness)
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn wait_for_health(&self, timeout: Duration) -> Result<()> {
        let url = self.url("/health");
        let start = Instant::now();
        while start.elapsed() < timeout {
            match self.http_client.get(&url).send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    debug!("health check for {url} returned {}", response.status());
                }
                Err(err) => {
                    debug!("health check for {url} failed: {err}");
                }
            };
            sleep(Duration::from_millis(50)).await;
        }
        Err(anyhow!("timeout waiting for service health at {url}"))
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
        if let Some(server) = self.server.take() {
            server.await.context("joining harness server")?;
        }
        Ok(())
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
    }
}

pub fn random_user_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    format!("{}-{}", prefix, rng.gen::<u32>())
}
