use std::sync::Arc;

use dashmap::DashMap;

use crate::tracker::{PeriodKey, Tier, TierRecord};

use super::error::StorageError;
use super::TierStore;

/// Process-local [`TierStore`]; records are lost on restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryTierStore {
    records: Arc<DashMap<String, TierRecord>>,
}

impl MemoryTierStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TierStore for MemoryTierStore {
    fn fetch(&self, user_id: &str) -> Result<Option<TierRecord>, StorageError> {
        Ok(self.records.get(user_id).map(|entry| entry.clone()))
    }

    fn insert_if_absent(&self, record: &TierRecord) -> Result<TierRecord, StorageError> {
        let entry = self
            .records
            .entry(record.user_id.clone())
            .or_insert_with(|| record.clone());
        Ok(entry.clone())
    }

    fn update(&self, record: &TierRecord) -> Result<Option<TierRecord>, StorageError> {
        Ok(self.records.get_mut(&record.user_id).map(|mut entry| {
            *entry = record.clone();
            entry.clone()
        }))
    }

    fn begin_period(
        &self,
        user_id: &str,
        period: &PeriodKey,
    ) -> Result<Option<TierRecord>, StorageError> {
        Ok(self.records.get_mut(user_id).and_then(|mut entry| {
            if entry.period_key == *period {
                return None;
            }
            entry.start_period(period.clone());
            Some(entry.clone())
        }))
    }

    fn increment_usage(
        &self,
        user_id: &str,
        period: &PeriodKey,
    ) -> Result<Option<TierRecord>, StorageError> {
        Ok(self.records.get_mut(user_id).and_then(|mut entry| {
            if entry.period_key != *period || !entry.has_remaining() {
                return None;
            }
            entry.used_this_period += 1;
            Some(entry.clone())
        }))
    }

    fn update_limit_for_tier(&self, tier: Tier, limit: u64) -> Result<usize, StorageError> {
        let mut changed = 0usize;
        for mut entry in self.records.iter_mut() {
            if entry.tier == tier {
                entry.limit = limit;
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn list(&self) -> Result<Vec<TierRecord>, StorageError> {
        let mut records: Vec<TierRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(records)
    }
}
