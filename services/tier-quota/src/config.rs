use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::tracker::{TierLimits, MAX_LIMIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("unknown store backend {other}, expected sqlite or memory"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TierQuotaConfig {
    pub server_host: String,
    pub server_port: u16,
    pub data_dir: PathBuf,
    pub store_backend: StoreBackend,
    pub free_limit: u64,
    pub premium_limit: u64,
    /// Limit of the synthetic record handed out while the store is unreachable.
    pub fallback_limit: u64,
    pub admin_token: Option<String>,
    pub log_level: String,
}

impl Default for TierQuotaConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8184,
            data_dir: PathBuf::from("data/tiers"),
            store_backend: StoreBackend::Sqlite,
            free_limit: 10,
            premium_limit: 200,
            fallback_limit: 10,
            admin_token: None,
            log_level: "info".to_string(),
        }
    }
}

impl TierQuotaConfig {
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(host) = env::var("QUOTA_HOST") {
            cfg.server_host = host;
        }
        if let Ok(port) = env::var("QUOTA_PORT") {
            cfg.server_port = port.parse().context("QUOTA_PORT must be a valid u16")?;
        }
        if let Ok(dir) = env::var("QUOTA_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Ok(backend) = env::var("QUOTA_STORE") {
            cfg.store_backend = backend.parse().context("QUOTA_STORE is invalid")?;
        }
        if let Ok(limit) = env::var("FREE_TIER_LIMIT") {
            cfg.free_limit = limit
                .parse()
                .context("FREE_TIER_LIMIT must be a positive integer")?;
        }
        if let Ok(limit) = env::var("PREMIUM_TIER_LIMIT") {
            cfg.premium_limit = limit
                .parse()
                .context("PREMIUM_TIER_LIMIT must be a positive integer")?;
        }
        cfg.fallback_limit = match env::var("FALLBACK_TIER_LIMIT") {
            Ok(limit) => limit
                .parse()
                .context("FALLBACK_TIER_LIMIT must be a positive integer")?,
            Err(_) => cfg.free_limit,
        };
        if let Ok(token) = env::var("QUOTA_ADMIN_TOKEN") {
            if !token.trim().is_empty() {
                cfg.admin_token = Some(token);
            }
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            cfg.log_level = level;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store_backend == StoreBackend::Sqlite {
            ensure_directory(&self.data_dir)?;
        }

        if self.free_limit == 0 {
            anyhow::bail!("FREE_TIER_LIMIT must be greater than zero");
        }
        if self.premium_limit == 0 {
            anyhow::bail!("PREMIUM_TIER_LIMIT must be greater than zero");
        }
        if self.fallback_limit == 0 {
            anyhow::bail!("FALLBACK_TIER_LIMIT must be greater than zero");
        }
        for (name, limit) in [
            ("FREE_TIER_LIMIT", self.free_limit),
            ("PREMIUM_TIER_LIMIT", self.premium_limit),
            ("FALLBACK_TIER_LIMIT", self.fallback_limit),
        ] {
            if limit > MAX_LIMIT {
                anyhow::bail!("{name} must not exceed {MAX_LIMIT}");
            }
        }

        Ok(())
    }

    /// Bearer token guarding the admin routes. `None` leaves them open.
    pub fn effective_admin_token(&self) -> Option<&str> {
        self.admin_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }

    pub fn tier_limits(&self) -> TierLimits {
        TierLimits {
            free: self.free_limit,
            premium: self.premium_limit,
        }
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            anyhow::bail!("{} exists but is not a directory", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("unable to create data directory {}", path.display()))?;
    }
    Ok(())
}
