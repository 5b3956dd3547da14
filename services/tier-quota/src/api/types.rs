use serde::{Deserialize, Serialize};

use crate::tracker::TierInfo;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserQuotaRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckQuotaResponse {
    pub allowed: bool,
    pub info: TierInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumeQuotaResponse {
    pub info: TierInfo,
    pub persisted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTierRequest {
    pub user_id: String,
    pub tier: String,
    #[serde(default)]
    pub reset_usage: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTierLimitsRequest {
    pub tier: String,
    pub limit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTierLimitsResponse {
    pub tier: String,
    pub limit: u64,
    pub updated: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub details: Option<serde_json::Value>,
}
