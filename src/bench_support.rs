use std::sync::Arc;

use mindset_tier_quota::{
    Clock, FixedClock, MemoryTierStore, TierDatabase, TierLimits, TierQuotaManager, TierStore,
};
use tempfile::TempDir;

pub use mindset_tier_quota;

pub const BENCH_LIMITS: TierLimits = TierLimits {
    free: 1_000_000,
    premium: 10_000_000,
};

pub struct QuotaBenchFixture {
    pub manager: Arc<TierQuotaManager>,
    pub clock: Arc<FixedClock>,
    pub temp_dir: Option<TempDir>,
}

impl QuotaBenchFixture {
    pub fn sqlite() -> Self {
        let temp_dir = TempDir::new().expect("tempdir");
        let database =
            TierDatabase::new(temp_dir.path().to_path_buf()).expect("open bench database");
        Self::with_store(Arc::new(database), Some(temp_dir))
    }

    pub fn memory() -> Self {
        Self::with_store(Arc::new(MemoryTierStore::new()), None)
    }

    fn with_store(store: Arc<dyn TierStore>, temp_dir: Option<TempDir>) -> Self {
        let clock = Arc::new(FixedClock::at_month(2024, 1).expect("valid bench month"));
        let manager_clock: Arc<dyn Clock> = clock.clone();
        let manager = TierQuotaManager::new(store, manager_clock, BENCH_LIMITS, BENCH_LIMITS.free);
        Self {
            manager: Arc::new(manager),
            clock,
            temp_dir,
        }
    }

    /// Creates `count` users that each already hold a record for the current period.
    pub fn seed_users(&self, prefix: &str, count: usize) -> Vec<String> {
        (0..count)
            .map(|idx| {
                let user_id = format!("{prefix}-{idx}");
                self.manager.resolve_current_record(&user_id);
                user_id
            })
            .collect()
    }
}
