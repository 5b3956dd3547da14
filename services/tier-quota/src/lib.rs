pub mod api;
pub mod config;
pub mod storage;
pub mod tracker;

pub use api::{create_router, ApiState};
pub use config::{StoreBackend, TierQuotaConfig};
pub use storage::{MemoryTierStore, StorageError, TierDatabase, TierStore};
pub use tracker::{
    Clock, ConsumeCheck, Consumption, FixedClock, GateError, Gated, PeriodKey, QuotaError,
    SystemClock, Tier, TierInfo, TierLimits, TierQuotaManager, TierRecord,
    MAX_LIMIT,
};
