mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(server.url("/health")).await?;
    let status = res.status();
    assert!(
        status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status: {}",
        status
    );

    let body: Value = res.json().await?;
    if status == StatusCode::OK {
        assert_eq!(body["data"]["database"], "ok");
    } else {
        assert_eq!(body["error"], true);
    }
    Ok(())
}

#[tokio::test]
async fn root_lists_the_endpoints() -> Result<()> {
    let server = common::ensure_server().await?;

    let body: Value = reqwest::get(server.url("/")).await?.json().await?;
    assert_eq!(body["success"], true);
    assert!(body["data"]["endpoints"]["hattra"].is_string());
    Ok(())
}
