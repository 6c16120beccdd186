mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use common::bearer;

#[tokio::test]
async fn anonymous_requests_to_gated_routes_are_401() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    for (method, path) in [
        (Method::GET, "/auth/whoami"),
        (Method::GET, "/kota"),
        (Method::GET, "/hattra"),
        (Method::GET, "/hattra/byUser/kota_bandung"),
        (Method::POST, "/hattra"),
        (Method::PATCH, "/layanan/verifikasi/1"),
        (Method::DELETE, "/layanan/1"),
    ] {
        let res = client
            .request(method.clone(), server.url(path))
            .json(&json!({}))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{} {}", method, path);

        let body: Value = res.json().await?;
        assert_eq!(body["error"], true);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
    Ok(())
}

#[tokio::test]
async fn roles_outside_the_gate_are_403() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    for (role, method, path) in [
        ("kota", Method::GET, "/provinsi"),
        ("user", Method::GET, "/layanan"),
        ("provinsi", Method::POST, "/layanan"),
        ("kestrad", Method::PATCH, "/layanan/1"),
        ("admin", Method::PATCH, "/hattra/1/verification"),
    ] {
        let res = client
            .request(method.clone(), server.url(path))
            .header("Authorization", bearer("someone", role))
            .json(&json!({ "nama_layanan": "Pijat" }))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::FORBIDDEN, "{} {} {}", role, method, path);
    }
    Ok(())
}

#[tokio::test]
async fn tokens_signed_with_another_secret_are_ignored() -> Result<()> {
    let server = common::ensure_server().await?;

    let claims = json!({ "sub": "root", "role": "admin", "status": "active", "iat": 0, "exp": 4_102_444_800i64 });
    let forged = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(b"not-the-secret"),
    )?;

    let res = reqwest::Client::new()
        .get(server.url("/auth/whoami"))
        .header("Authorization", format!("Bearer {}", forged))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn whoami_returns_the_token_identity() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::Client::new()
        .get(server.url("/auth/whoami"))
        .header("Authorization", bearer("kestrad_budi", "kestrad"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], "kestrad_budi");
    assert_eq!(body["data"]["role"], "kestrad");
    Ok(())
}

#[tokio::test]
async fn login_rejects_malformed_bodies() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::Client::new()
        .post(server.url("/auth/login"))
        .json(&json!({ "username": "only-a-name" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
