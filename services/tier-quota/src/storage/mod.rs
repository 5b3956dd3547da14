pub mod database;
pub mod error;
pub mod memory;
pub mod schema;

pub use database::TierDatabase;
pub use error::StorageError;
pub use memory::MemoryTierStore;

use crate::tracker::{PeriodKey, Tier, TierRecord};

pub const TIER_DB_FILENAME: &str = "tiers.db";
pub const USER_TIERS_TABLE: &str = "user_tiers";

/// Persistent home of one [`TierRecord`] per user.
///
/// Every method distinguishes a failed call (`Err`) from a call that matched
/// nothing (`Ok(None)` / `Ok(0)`).
pub trait TierStore: Send + Sync {
    fn fetch(&self, user_id: &str) -> Result<Option<TierRecord>, StorageError>;

    /// Inserts `record` unless a row for its user already exists, returning
    /// whichever row is stored afterwards.
    fn insert_if_absent(&self, record: &TierRecord) -> Result<TierRecord, StorageError>;

    /// Overwrites tier, usage, limit and period of an existing row.
    fn update(&self, record: &TierRecord) -> Result<Option<TierRecord>, StorageError>;

    /// Moves a row whose period differs from `period` onto it with zero usage.
    /// Leaves tier and limit untouched. `None` when no such row exists.
    fn begin_period(
        &self,
        user_id: &str,
        period: &PeriodKey,
    ) -> Result<Option<TierRecord>, StorageError>;

    /// Adds one to the usage counter of a row that is still in `period` and
    /// below its limit. Leaves every other field untouched. `None` when no
    /// row satisfies those conditions.
    fn increment_usage(
        &self,
        user_id: &str,
        period: &PeriodKey,
    ) -> Result<Option<TierRecord>, StorageError>;

    fn update_limit_for_tier(&self, tier: Tier, limit: u64) -> Result<usize, StorageError>;

    fn list(&self) -> Result<Vec<TierRecord>, StorageError>;
}
