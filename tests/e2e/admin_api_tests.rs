use super::{random_user_id, TestHarness, ADMIN_TOKEN};
use anyhow::Result;
use reqwest::Response;
use serde_json::{json, Value};

async fn admin_post(harness: &TestHarness, path: &str, body: Value) -> Result<Response> {
    Ok(harness
        .http_client()
        .post(harness.url(path))
        .bearer_auth(ADMIN_TOKEN)
        .json(&body)
        .send()
        .await?)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_upgrade_to_premium() -> Result<()> {
    let mut harness = TestHarness::start().await?;
    let user = random_user_id("upgrader");

    let response = admin_post(
        &harness,
        "/api/tier",
        json!({ "user_id": user, "tier": "premium" }),
    )
    .await?;
    assert_eq!(response.status(), 200);
    let info: Value = response.json().await?;
    assert_eq!(info["tier"], json!("premium"));
    assert_eq!(info["limit"], json!(5));

    let info: Value = harness
        .http_client()
        .get(harness.url(&format!("/api/quota/{user}")))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(info["tier"], json!("premium"));
    assert_eq!(info["remaining"], json!(5));

    harness.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_tier_returns_bad_request() -> Result<()> {
    let mut harness = TestHarness::start().await?;
    let user = random_user_id("invalid");

    let response = admin_post(
        &harness,
        "/api/tier",
        json!({ "user_id": user, "tier": "enterprise" }),
    )
    .await?;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["code"], json!("invalid_tier"));

    harness.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_admin_routes_require_token() -> Result<()> {
    let mut harness = TestHarness::start().await?;

    let response = harness
        .http_client()
        .post(harness.url("/api/tier"))
        .json(&json!({ "user_id": "someone", "tier": "premium" }))
        .send()
        .await?;
    assert_eq!(response.status(), 401);

    let response = harness
        .http_client()
        .get(harness.url("/api/quota"))
        .bearer_auth("wrong-token")
        .send()
        .await?;
    assert_eq!(response.status(), 401);

    harness.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_admin_routes_open_without_configured_token() -> Result<()> {
    let mut harness = TestHarness::start_with(|config| config.admin_token = None).await?;

    let response = harness
        .http_client()
        .post(harness.url("/api/tier"))
        .json(&json!({ "user_id": "open-admin", "tier": "premium" }))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    harness.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bulk_tier_limit_update() -> Result<()> {
    let mut harness = TestHarness::start().await?;
    let existing = random_user_id("existing");

    admin_post(&harness, "/api/quota/consume", json!({ "user_id": existing })).await?;

    let response = admin_post(
        &harness,
        "/api/tier/limits",
        json!({ "tier": "free", "limit": 7 }),
    )
    .await?;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["updated"], json!(1));

    let records: Value = harness
        .http_client()
        .get(harness.url("/api/quota"))
        .bearer_auth(ADMIN_TOKEN)
        .send()
        .await?
        .json()
        .await?;
    let records = records.as_array().cloned().unwrap_or_default();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["limit"], json!(7));
    assert_eq!(records[0]["used_this_period"], json!(1));

    let newcomer = random_user_id("newcomer");
    let info: Value = harness
        .http_client()
        .get(harness.url(&format!("/api/quota/{newcomer}")))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(info["limit"], json!(7));

    let response = admin_post(
        &harness,
        "/api/tier/limits",
        json!({ "tier": "premium", "limit": 0 }),
    )
    .await?;
    assert_eq!(response.status(), 400);

    let response = admin_post(
        &harness,
        "/api/tier/limits",
        json!({ "tier": "free", "limit": u64::MAX }),
    )
    .await?;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["code"], json!("invalid_limit"));

    harness.shutdown().await?;
    Ok(())
}
