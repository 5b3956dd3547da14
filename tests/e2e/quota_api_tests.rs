use super::{random_user_id, TestHarness};
use anyhow::Result;
use serde_json::{json, Value};

async fn post_json(harness: &TestHarness, path: &str, body: Value) -> Result<(u16, Value)> {
    let response = harness
        .http_client()
        .post(harness.url(path))
        .json(&body)
        .send()
        .await?;
    let status = response.status().as_u16();
    let body: Value = response.json().await?;
    Ok((status, body))
}

#[tokio::test(flavor = "multi_thread")]
async fn test_free_user_is_throttled_after_limit() -> Result<()> {
    let mut harness = TestHarness::start().await?;
    let user = random_user_id("writer");

    for expected_used in 0..2u64 {
        let (status, check) =
            post_json(&harness, "/api/quota/check", json!({ "user_id": user })).await?;
        assert_eq!(status, 200);
        assert_eq!(check["allowed"], json!(true));
        assert_eq!(check["info"]["used"], json!(expected_used));

        let (status, consumed) =
            post_json(&harness, "/api/quota/consume", json!({ "user_id": user })).await?;
        assert_eq!(status, 200);
        assert_eq!(consumed["persisted"], json!(true));
        assert_eq!(consumed["info"]["used"], json!(expected_used + 1));
    }

    let (status, check) =
        post_json(&harness, "/api/quota/check", json!({ "user_id": user })).await?;
    assert_eq!(status, 200);
    assert_eq!(check["allowed"], json!(false));
    assert_eq!(check["info"]["remaining"], json!(0));
    assert_eq!(check["info"]["tier"], json!("free"));

    harness.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_consume_past_limit_returns_too_many_requests() -> Result<()> {
    let mut harness = TestHarness::start().await?;
    let user = random_user_id("eager");

    for _ in 0..2 {
        let (status, _) =
            post_json(&harness, "/api/quota/consume", json!({ "user_id": user })).await?;
        assert_eq!(status, 200);
    }

    let (status, body) =
        post_json(&harness, "/api/quota/consume", json!({ "user_id": user })).await?;
    assert_eq!(status, 429);
    assert_eq!(body["code"], json!("quota_exhausted"));
    assert_eq!(body["details"]["used"], json!(2));
    assert_eq!(body["details"]["limit"], json!(2));
    assert_eq!(body["details"]["remaining"], json!(0));

    let (status, check) =
        post_json(&harness, "/api/quota/check", json!({ "user_id": user })).await?;
    assert_eq!(status, 200);
    assert_eq!(check["info"]["used"], json!(2));

    harness.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_quota_renews_in_next_month() -> Result<()> {
    let mut harness = TestHarness::start().await?;
    let user = random_user_id("monthly");

    post_json(&harness, "/api/quota/consume", json!({ "user_id": user })).await?;
    post_json(&harness, "/api/quota/consume", json!({ "user_id": user })).await?;
    let (_, check) = post_json(&harness, "/api/quota/check", json!({ "user_id": user })).await?;
    assert_eq!(check["allowed"], json!(false));

    assert!(harness.clock.set_month(2024, 2));

    let (_, check) = post_json(&harness, "/api/quota/check", json!({ "user_id": user })).await?;
    assert_eq!(check["allowed"], json!(true));
    assert_eq!(check["info"]["used"], json!(0));
    assert_eq!(check["info"]["period"], json!("2024-02"));

    harness.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tier_info_for_unknown_user_creates_default() -> Result<()> {
    let mut harness = TestHarness::start().await?;
    let user = random_user_id("reader");

    let response = harness
        .http_client()
        .get(harness.url(&format!("/api/quota/{user}")))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let info: Value = response.json().await?;
    assert_eq!(info["user_id"], json!(user));
    assert_eq!(info["tier"], json!("free"));
    assert_eq!(info["used"], json!(0));
    assert_eq!(info["limit"], json!(2));
    assert_eq!(info["remaining"], json!(2));
    assert_eq!(info["period"], json!("2024-01"));

    harness.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_user_id_is_rejected() -> Result<()> {
    let mut harness = TestHarness::start().await?;

    let (status, body) = post_json(&harness, "/api/quota/check", json!({ "user_id": "  " })).await?;
    assert_eq!(status, 400);
    assert_eq!(body["code"], json!("invalid_user_id"));

    let (status, _) = post_json(&harness, "/api/quota/consume", json!({ "user_id": "" })).await?;
    assert_eq!(status, 400);

    harness.shutdown().await?;
    Ok(())
}
