//! Admin authentication integration tests.
//!
//! Covers `/api/v1/admin/login` and the admin gate on `/api/v1/room/close`.

use reqwest::{Client, StatusCode};
use room_test_utils::{TestAdminToken, TestRoomServer, TEST_ADMIN_PASS, TEST_PASSCODE};
use serde_json::{json, Value};

async fn close_with_auth(
    client: &Client,
    server: &TestRoomServer,
    authorization: Option<&str>,
) -> Result<reqwest::Response, anyhow::Error> {
    let mut request = client.post(format!("{}/api/v1/room/close", server.url()));
    if let Some(value) = authorization {
        request = request.header("authorization", value);
    }
    Ok(request.send().await?)
}

async fn open_room(client: &Client, server: &TestRoomServer) -> Result<(), anyhow::Error> {
    let response = client
        .post(format!("{}/api/v1/room/init", server.url()))
        .json(&json!({ "passcode": TEST_PASSCODE, "size": 2 }))
        .send()
        .await?;
    anyhow::ensure!(response.status() == 200, "init failed");
    Ok(())
}

async fn is_open(client: &Client, server: &TestRoomServer) -> Result<bool, anyhow::Error> {
    let body: Value = client
        .get(format!("{}/api/v1/room/status", server.url()))
        .send()
        .await?
        .json()
        .await?;
    Ok(body["open"] == true)
}

#[tokio::test]
async fn test_login_with_correct_password() -> Result<(), anyhow::Error> {
    let server = TestRoomServer::spawn().await?;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/v1/admin/login", server.url()))
        .json(&json!({ "password": format!("  {TEST_ADMIN_PASS}  ") }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["token"].as_str().map(|t| t.split('.').count()), Some(3));

    Ok(())
}

#[tokio::test]
async fn test_login_with_wrong_password() -> Result<(), anyhow::Error> {
    let server = TestRoomServer::spawn().await?;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/v1/admin/login", server.url()))
        .json(&json!({ "password": "guess" }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    Ok(())
}

#[tokio::test]
async fn test_close_without_token_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestRoomServer::spawn().await?;
    let client = Client::new();
    open_room(&client, &server).await?;

    let response = close_with_auth(&client, &server, None).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get("www-authenticate").is_some());
    assert!(is_open(&client, &server).await?);

    Ok(())
}

#[tokio::test]
async fn test_close_with_invalid_tokens_is_rejected() -> Result<(), anyhow::Error> {
    let server = TestRoomServer::spawn().await?;
    let client = Client::new();
    open_room(&client, &server).await?;

    let cases = [
        ("expired", TestAdminToken::new().expires_in(-3600).sign()),
        ("visitor", TestAdminToken::new().for_subject("visitor").sign()),
        (
            "foreign key",
            TestAdminToken::new()
                .signed_with(b"some-other-secret-some-other-key")
                .sign(),
        ),
        ("wrong issuer", TestAdminToken::new().with_issuer("elsewhere").sign()),
        ("future iat", TestAdminToken::new().issued_in(3600).expires_in(7200).sign()),
        ("garbage", "not-a-token".to_string()),
    ];

    for (name, token) in cases {
        let response = close_with_auth(&client, &server, Some(&format!("Bearer {token}"))).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "case {name}");
    }

    assert!(is_open(&client, &server).await?);

    Ok(())
}

#[tokio::test]
async fn test_close_accepts_lowercase_bearer_scheme() -> Result<(), anyhow::Error> {
    let server = TestRoomServer::spawn().await?;
    let client = Client::new();
    open_room(&client, &server).await?;

    let token = TestAdminToken::new().sign();
    let response = close_with_auth(&client, &server, Some(&format!("bearer {token}"))).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!is_open(&client, &server).await?);

    Ok(())
}

#[tokio::test]
async fn test_close_is_idempotent_over_http() -> Result<(), anyhow::Error> {
    let server = TestRoomServer::spawn().await?;
    let client = Client::new();
    let token = server.admin_token(&client).await?;
    let header = format!("Bearer {token}");

    for _ in 0..2 {
        let response = close_with_auth(&client, &server, Some(&header)).await?;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await?;
        assert_eq!(body["open"], false);
    }

    Ok(())
}
