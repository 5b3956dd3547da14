pub mod error;
pub mod gate;
pub mod manager;
pub mod outcome;
pub mod period;
pub mod record;

pub use error::{GateError, InvalidTier, QuotaError};
pub use gate::Gated;
pub use manager::TierQuotaManager;
pub use outcome::WriteOutcome;
pub use period::{Clock, FixedClock, PeriodKey, SystemClock};
pub use record::{
    ConsumeCheck, Consumption, Tier, TierInfo, TierLimits, TierRecord, MAX_LIMIT,
};
