use thiserror::Error;

use crate::storage::StorageError;

use super::record::TierRecord;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid tier '{0}': must be 'free' or 'premium'")]
pub struct InvalidTier(pub String);

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error(transparent)]
    InvalidTier(#[from] InvalidTier),
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    #[error("user {0} not found")]
    UserNotFound(String),
    #[error("storage error: {0}")]
    StorageError(#[from] StorageError),
}

/// Failure of a usage-gated action.
#[derive(Debug, Error)]
pub enum GateError<E> {
    #[error(
        "monthly quota exhausted for user {}: used={}, limit={}",
        .0.user_id,
        .0.used_this_period,
        .0.limit
    )]
    QuotaExhausted(TierRecord),
    #[error("gated action failed: {0}")]
    Action(E),
}
