use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use tracing::{error, info, warn};

use crate::tracker::{QuotaError, TierInfo, TierRecord};

use super::types::{
    CheckQuotaResponse, ConsumeQuotaResponse, ErrorResponse, SetTierLimitsRequest,
    SetTierLimitsResponse, SetTierRequest, UserQuotaRequest,
};
use super::ApiState;

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

pub async fn check_quota(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<UserQuotaRequest>,
) -> ApiResult<CheckQuotaResponse> {
    require_user_id(&request.user_id)?;

    let check = state.quota_manager.can_consume(&request.user_id);
    Ok(Json(CheckQuotaResponse {
        allowed: check.allowed,
        info: TierInfo::from(&check.record),
    }))
}

pub async fn consume_quota(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<UserQuotaRequest>,
) -> ApiResult<ConsumeQuotaResponse> {
    require_user_id(&request.user_id)?;

    let consumption = state.quota_manager.record_consumption(&request.user_id);
    let record = &consumption.record;
    if !consumption.persisted && !record.has_remaining() {
        info!(
            user_id = %request.user_id,
            used = record.used_this_period,
            limit = record.limit,
            "consume refused, quota exhausted"
        );
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse {
                error: "monthly quota exhausted".to_string(),
                code: "quota_exhausted".to_string(),
                details: Some(serde_json::to_value(TierInfo::from(record)).unwrap_or_default()),
            }),
        ));
    }

    Ok(Json(ConsumeQuotaResponse {
        info: TierInfo::from(&consumption.record),
        persisted: consumption.persisted,
    }))
}

pub async fn get_tier_info(
    State(state): State<Arc<ApiState>>,
    Path(user_id): Path<String>,
) -> ApiResult<TierInfo> {
    require_user_id(&user_id)?;
    Ok(Json(state.quota_manager.get_tier_info(&user_id)))
}

pub async fn list_records(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<TierRecord>> {
    authorize_admin(&state, &headers)?;

    let records = state
        .quota_manager
        .list_records()
        .map_err(quota_error)?;
    Ok(Json(records))
}

pub async fn set_tier(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(request): Json<SetTierRequest>,
) -> ApiResult<TierInfo> {
    authorize_admin(&state, &headers)?;
    require_user_id(&request.user_id)?;

    let record = state
        .quota_manager
        .set_tier(&request.user_id, &request.tier, request.reset_usage)
        .map_err(quota_error)?;

    Ok(Json(TierInfo::from(&record)))
}

pub async fn set_tier_limits(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(request): Json<SetTierLimitsRequest>,
) -> ApiResult<SetTierLimitsResponse> {
    authorize_admin(&state, &headers)?;

    let updated = state
        .quota_manager
        .set_limits_for_tier(&request.tier, request.limit)
        .map_err(quota_error)?;

    info!(
        tier = %request.tier,
        limit = request.limit,
        updated,
        "tier limits updated"
    );

    Ok(Json(SetTierLimitsResponse {
        tier: request.tier,
        limit: request.limit,
        updated,
    }))
}

pub async fn health_check() -> ApiResult<serde_json::Value> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": "tier-quota"
    })))
}

fn require_user_id(user_id: &str) -> Result<(), ApiError> {
    if user_id.trim().is_empty() {
        return Err(bad_request("invalid_user_id", "user_id cannot be empty"));
    }
    Ok(())
}

fn authorize_admin(state: &ApiState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.config.effective_admin_token() else {
        return Ok(());
    };

    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if provided == Some(expected) {
        Ok(())
    } else {
        warn!("rejected admin request with missing or invalid token");
        Err(error_response(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "admin token required",
        ))
    }
}

fn quota_error(err: QuotaError) -> ApiError {
    match err {
        QuotaError::InvalidTier(invalid) => bad_request("invalid_tier", &invalid.to_string()),
        QuotaError::InvalidLimit(message) => bad_request("invalid_limit", &message),
        QuotaError::UserNotFound(_) => error_response(
            StatusCode::NOT_FOUND,
            "user_not_found",
            "user has no tier record",
        ),
        err @ QuotaError::StorageError(_) => internal_error(err),
    }
}

fn bad_request(code: &str, message: &str) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, code, message)
}

fn error_response(status: StatusCode, code: &str, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
            code: code.to_string(),
            details: None,
        }),
    )
}

fn internal_error<E: std::fmt::Display>(err: E) -> ApiError {
    error!(error = %err, "tier quota API internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "internal server error".to_string(),
            code: "internal_error".to_string(),
            details: Some(serde_json::json!({ "message": err.to_string() })),
        }),
    )
}
