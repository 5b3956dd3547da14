use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use crate::config::TierQuotaConfig;
use crate::storage::{StorageError, TierStore};

use super::error::QuotaError;
use super::outcome::{non_critical, WriteOutcome};
use super::period::{Clock, PeriodKey};
use super::record::{
    ConsumeCheck, Consumption, Tier, TierInfo, TierLimits, TierRecord, MAX_LIMIT,
};

/// Monthly per-user quota policy over a [`TierStore`].
///
/// The read path fails open: when the store cannot be reached, callers get a
/// synthetic free-tier record with the configured fallback limit instead of an
/// error. Increments are best effort and never roll back the gated action.
#[derive(Clone)]
pub struct TierQuotaManager {
    store: Arc<dyn TierStore>,
    clock: Arc<dyn Clock>,
    limits: Arc<RwLock<TierLimits>>,
    fallback_limit: u64,
}

impl TierQuotaManager {
    pub fn new(
        store: Arc<dyn TierStore>,
        clock: Arc<dyn Clock>,
        limits: TierLimits,
        fallback_limit: u64,
    ) -> Self {
        Self {
            store,
            clock,
            limits: Arc::new(RwLock::new(limits)),
            fallback_limit,
        }
    }

    pub fn from_config(
        store: Arc<dyn TierStore>,
        clock: Arc<dyn Clock>,
        config: &TierQuotaConfig,
    ) -> Self {
        Self::new(store, clock, config.tier_limits(), config.fallback_limit)
    }

    pub fn limits(&self) -> TierLimits {
        *self
            .limits
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current_period(&self) -> PeriodKey {
        self.clock.current_period()
    }

    pub fn resolve_current_record(&self, user_id: &str) -> TierRecord {
        match self.load_current(user_id) {
            Ok(record) => record,
            Err(err) => {
                warn!(
                    user_id,
                    error = %err,
                    fallback_limit = self.fallback_limit,
                    "tier store unavailable, using fallback record"
                );
                TierRecord::new(
                    user_id,
                    Tier::Free,
                    self.fallback_limit,
                    self.current_period(),
                )
            }
        }
    }

    pub fn can_consume(&self, user_id: &str) -> ConsumeCheck {
        let record = self.resolve_current_record(user_id);
        ConsumeCheck {
            allowed: record.has_remaining(),
            record,
        }
    }

    /// Counts one performed action against the user's current period.
    ///
    /// Call only after the action's own result has been committed. Only the
    /// counter is written, so a tier or limit change made in the meantime
    /// survives. When the fresh record is already at its limit, or the write
    /// does not land, the pre-increment record comes back with
    /// `persisted == false`.
    pub fn record_consumption(&self, user_id: &str) -> Consumption {
        let current = self.resolve_current_record(user_id);

        if !current.has_remaining() {
            warn!(
                user_id,
                used = current.used_this_period,
                limit = current.limit,
                "consumption recorded against exhausted quota, not incrementing"
            );
            return Consumption {
                record: current,
                persisted: false,
            };
        }

        match non_critical("record_consumption", user_id, || {
            self.store.increment_usage(user_id, &current.period_key)
        }) {
            WriteOutcome::Persisted(stored) => {
                debug!(
                    user_id,
                    used = stored.used_this_period,
                    limit = stored.limit,
                    "recorded consumption"
                );
                Consumption {
                    record: stored,
                    persisted: true,
                }
            }
            WriteOutcome::Skipped { .. } => Consumption {
                record: current,
                persisted: false,
            },
        }
    }

    pub fn get_tier_info(&self, user_id: &str) -> TierInfo {
        TierInfo::from(&self.resolve_current_record(user_id))
    }

    /// Moves a user onto `tier` and its default limit, creating the record if needed.
    pub fn set_tier(
        &self,
        user_id: &str,
        tier: &str,
        reset_usage: bool,
    ) -> Result<TierRecord, QuotaError> {
        let tier: Tier = tier.parse()?;
        let period = self.current_period();
        let limit = self.limits().for_tier(tier);

        let base = match self.store.fetch(user_id)? {
            Some(record) => record,
            None => self
                .store
                .insert_if_absent(&TierRecord::new(user_id, tier, limit, period.clone()))?,
        };

        let mut next = base.clone();
        if next.is_stale(&period) {
            next.start_period(period);
        }
        next.tier = tier;
        next.limit = limit;
        if reset_usage {
            next.used_this_period = 0;
        }

        let record = if next == base {
            base
        } else {
            self.store
                .update(&next)?
                .ok_or_else(|| QuotaError::UserNotFound(user_id.to_string()))?
        };

        info!(user_id, tier = %record.tier, limit = record.limit, reset_usage, "updated user tier");
        Ok(record)
    }

    /// Applies `limit` to every stored record on `tier` and to the default for new users.
    pub fn set_limits_for_tier(&self, tier: &str, limit: u64) -> Result<usize, QuotaError> {
        let tier: Tier = tier.parse()?;
        if limit == 0 {
            return Err(QuotaError::InvalidLimit(
                "limit must be greater than zero".into(),
            ));
        }
        if limit > MAX_LIMIT {
            return Err(QuotaError::InvalidLimit(format!(
                "limit must not exceed {MAX_LIMIT}"
            )));
        }

        let updated = self.store.update_limit_for_tier(tier, limit)?;
        self.limits
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .set(tier, limit);

        info!(tier = %tier, limit, updated, "updated tier limits");
        Ok(updated)
    }

    pub fn list_records(&self) -> Result<Vec<TierRecord>, QuotaError> {
        Ok(self.store.list()?)
    }

    fn load_current(&self, user_id: &str) -> Result<TierRecord, StorageError> {
        let period = self.current_period();

        let record = match self.store.fetch(user_id)? {
            Some(record) => record,
            None => {
                let free_limit = self.limits().free;
                let created = self.store.insert_if_absent(&TierRecord::new(
                    user_id,
                    Tier::Free,
                    free_limit,
                    period.clone(),
                ))?;
                info!(user_id, limit = created.limit, "created tier record");
                created
            }
        };

        if !record.is_stale(&period) {
            return Ok(record);
        }

        let previous_period = record.period_key.clone();
        let stored = match self.store.begin_period(user_id, &period)? {
            Some(stored) => stored,
            // Another request rolled the row over first, or it vanished.
            None => match self.store.fetch(user_id)? {
                Some(stored) => stored,
                None => self.store.insert_if_absent(&TierRecord::new(
                    user_id,
                    record.tier,
                    record.limit,
                    period,
                ))?,
            },
        };
        debug!(
            user_id,
            previous_period = %previous_period,
            period = %stored.period_key,
            "rolled tier record into new period"
        );
        Ok(stored)
    }
}
