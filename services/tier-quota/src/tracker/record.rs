use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::InvalidTier;
use super::period::PeriodKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Premium,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = InvalidTier;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "free" => Ok(Tier::Free),
            "premium" => Ok(Tier::Premium),
            other => Err(InvalidTier(other.to_string())),
        }
    }
}

/// Largest limit the tier store can hold.
pub const MAX_LIMIT: u64 = i64::MAX as u64;

/// Default monthly limit for each tier, shared by every user on that tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    pub free: u64,
    pub premium: u64,
}

impl TierLimits {
    pub fn for_tier(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Free => self.free,
            Tier::Premium => self.premium,
        }
    }

    pub fn set(&mut self, tier: Tier, limit: u64) {
        match tier {
            Tier::Free => self.free = limit,
            Tier::Premium => self.premium = limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRecord {
    pub user_id: String,
    pub tier: Tier,
    pub used_this_period: u64,
    pub limit: u64,
    pub period_key: PeriodKey,
}

impl TierRecord {
    pub fn new(user_id: &str, tier: Tier, limit: u64, period_key: PeriodKey) -> Self {
        Self {
            user_id: user_id.to_string(),
            tier,
            used_this_period: 0,
            limit,
            period_key,
        }
    }

    pub fn has_remaining(&self) -> bool {
        self.used_this_period < self.limit
    }

    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used_this_period)
    }

    pub fn is_stale(&self, current: &PeriodKey) -> bool {
        self.period_key != *current
    }

    pub fn start_period(&mut self, period: PeriodKey) {
        self.used_this_period = 0;
        self.period_key = period;
    }
}

/// Display projection of a [`TierRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierInfo {
    pub user_id: String,
    pub tier: Tier,
    pub used: u64,
    pub limit: u64,
    pub remaining: u64,
    pub period: PeriodKey,
}

impl From<&TierRecord> for TierInfo {
    fn from(record: &TierRecord) -> Self {
        Self {
            user_id: record.user_id.clone(),
            tier: record.tier,
            used: record.used_this_period,
            limit: record.limit,
            remaining: record.remaining(),
            period: record.period_key.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeCheck {
    pub allowed: bool,
    pub record: TierRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumption {
    pub record: TierRecord,
    pub persisted: bool,
}
