use std::future::Future;

use tracing::{debug, info};

use super::error::GateError;
use super::manager::TierQuotaManager;
use super::record::TierRecord;

/// Value produced by a gated action together with the usage it left behind.
#[derive(Debug, Clone)]
pub struct Gated<T> {
    pub value: T,
    pub usage: TierRecord,
    pub usage_persisted: bool,
}

impl TierQuotaManager {
    /// Runs `action` if `user_id` has quota left and counts it once it succeeds.
    ///
    /// A denied user gets [`GateError::QuotaExhausted`] with no state touched.
    /// A failed action consumes nothing. The action receives the record the
    /// decision was made on.
    pub async fn run_gated<T, E, F, Fut>(
        &self,
        user_id: &str,
        action: F,
    ) -> Result<Gated<T>, GateError<E>>
    where
        F: FnOnce(TierRecord) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let check = self.can_consume(user_id);
        if !check.allowed {
            info!(
                user_id,
                used = check.record.used_this_period,
                limit = check.record.limit,
                "denied gated action, monthly quota exhausted"
            );
            return Err(GateError::QuotaExhausted(check.record));
        }

        let value = action(check.record).await.map_err(GateError::Action)?;

        let consumption = self.record_consumption(user_id);
        debug!(
            user_id,
            used = consumption.record.used_this_period,
            persisted = consumption.persisted,
            "gated action completed"
        );

        Ok(Gated {
            value,
            usage: consumption.record,
            usage_persisted: consumption.persisted,
        })
    }
}
