//! Account creation

mod common;

use common::{create_test_server, session, signup, EmailKind, ADMIN_EMAIL};
use serde_json::{json, Value};

#[tokio::test]
async fn test_signup_then_me() {
    let (server, _email_sender, _store) = create_test_server();

    let response = server
        .post("/signup")
        .json(&json!({ "email": "t@x.com", "password": "Aa123456" }))
        .await;
    assert_eq!(response.status_code(), 201);

    let cookie = response.maybe_cookie("session").expect("No session cookie");
    assert!(!cookie.value().is_empty());
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.same_site(), Some(cookie::SameSite::Lax));
    assert_eq!(cookie.path(), Some("/"));
    assert!(cookie.max_age().is_some());

    let response = server
        .get("/me")
        .add_cookie(session(cookie.value()))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["user"]["email"], "t@x.com");
    assert_eq!(body["user"]["role"], "user");
    assert_eq!(body["user"]["email_verified"], false);
    assert_eq!(body["user"]["plan"], "free");
    assert!(body["user"]["id"].is_u64());
    assert!(body["user"]["created_at"].is_string());
}

#[tokio::test]
async fn test_profile_never_exposes_password_hash() {
    let (server, _email_sender, _store) = create_test_server();

    let (cookie, user) = signup(&server, "hash@example.com", "password123").await;
    assert!(user.get("password_hash").is_none());

    let body: Value = server.get("/me").add_cookie(session(&cookie)).await.json();
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_signup_duplicate_email_is_case_insensitive() {
    let (server, _email_sender, _store) = create_test_server();

    signup(&server, "Shopper@Example.com", "password123").await;

    let response = server
        .post("/signup")
        .json(&json!({ "email": "shopper@example.COM", "password": "password456" }))
        .await;

    assert_eq!(response.status_code(), 409);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn test_signup_short_password_rejected() {
    let (server, _email_sender, store) = create_test_server();

    let response = server
        .post("/signup")
        .json(&json!({ "email": "short@example.com", "password": "1234567" }))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "password too short");
    assert!(response.maybe_cookie("session").is_none());

    use storefront_auth::store::UserStore;
    assert!(store.get_user_by_email("short@example.com").unwrap().is_none());
}

#[tokio::test]
async fn test_signup_missing_fields_rejected() {
    let (server, _email_sender, _store) = create_test_server();

    for body in [
        json!({ "email": "missing@example.com" }),
        json!({ "password": "password123" }),
        json!({ "email": "", "password": "password123" }),
        json!({}),
    ] {
        let response = server.post("/signup").json(&body).await;
        assert_eq!(response.status_code(), 400);
        let body: Value = response.json();
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_signup_malformed_json_rejected() {
    let (server, _email_sender, _store) = create_test_server();

    let response = server
        .post("/signup")
        .text("{not json")
        .content_type("application/json")
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_signup_sends_welcome_and_verification() {
    let (server, email_sender, _store) = create_test_server();

    signup(&server, "mail@example.com", "password123").await;

    email_sender
        .wait_for_link(EmailKind::Welcome, "mail@example.com")
        .await;
    let link = email_sender
        .wait_for_link(EmailKind::Verification, "mail@example.com")
        .await;
    assert!(link.starts_with("http://shop.test/verify-email?token="));
}

#[tokio::test]
async fn test_signup_with_admin_email_starts_as_user() {
    let (server, _email_sender, _store) = create_test_server();

    let (_cookie, user) = signup(&server, &ADMIN_EMAIL.to_uppercase(), "password123").await;
    assert_eq!(user["role"], "user");
}

#[tokio::test]
async fn test_signup_password_past_bcrypt_limit_rejected() {
    let (server, _email_sender, _store) = create_test_server();

    let response = server
        .post("/signup")
        .json(&json!({ "email": "long@example.com", "password": "p".repeat(73) }))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "password too long");
}

#[tokio::test]
async fn test_signup_keeps_optional_name() {
    let (server, _email_sender, _store) = create_test_server();

    let response = server
        .post("/signup")
        .json(&json!({ "email": "named@example.com", "password": "password123", "name": "Ada" }))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(body["user"]["name"], "Ada");
}
