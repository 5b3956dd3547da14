use std::sync::Arc;

pub mod handlers;
pub mod router;
pub mod types;

pub use router::create_router;
pub use types::*;

use crate::config::TierQuotaConfig;
use crate::tracker::TierQuotaManager;

pub struct ApiState {
    pub quota_manager: Arc<TierQuotaManager>,
    pub config: Arc<TierQuotaConfig>,
}

impl ApiState {
    pub fn new(quota_manager: Arc<TierQuotaManager>, config: TierQuotaConfig) -> Self {
        Self {
            quota_manager,
            config: Arc::new(config),
        }
    }
}
