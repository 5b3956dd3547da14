use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Calendar year-month window over which usage accumulates, rendered as `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodKey(String);

impl PeriodKey {
    pub fn for_instant(instant: &DateTime<Utc>) -> Self {
        Self(format!("{:04}-{:02}", instant.year(), instant.month()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PeriodKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PeriodKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn current_period(&self) -> PeriodKey {
        PeriodKey::for_instant(&self.now())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to an instant that tests can move forward across month boundaries.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Mid-month noon UTC of the given year and month, or `None` when
    /// `month` is outside 1..=12.
    pub fn at_month(year: i32, month: u32) -> Option<Self> {
        mid_month(year, month).map(Self::new)
    }

    pub fn set(&self, now: DateTime<Utc>) {
        let mut guard = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = now;
    }

    /// Moves to the given month. Returns `false` and leaves the clock alone
    /// when the month is invalid.
    pub fn set_month(&self, year: i32, month: u32) -> bool {
        match mid_month(year, month) {
            Some(now) => {
                self.set(now);
                true
            }
            None => false,
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn mid_month(year: i32, month: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, 15, 12, 0, 0).single()
}
