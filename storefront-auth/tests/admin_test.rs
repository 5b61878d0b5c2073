//! Admin-only routes and the authorization gate

mod common;

use common::{create_test_server, session, signup, signup_admin, EmailKind, ADMIN_EMAIL};
use serde_json::{json, Value};

#[tokio::test]
async fn test_list_users_as_admin() {
    let (server, email_sender, _store) = create_test_server();
    let admin = signup_admin(&server, &email_sender).await;
    signup(&server, "customer@example.com", "password123").await;

    let response = server.get("/admin/users").add_cookie(session(&admin)).await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("password_hash").is_none()));
}

#[tokio::test]
async fn test_admin_routes_forbidden_for_users_and_anonymous() {
    let (server, _email_sender, _store) = create_test_server();
    let (customer, user) = signup(&server, "customer@example.com", "password123").await;
    let id = user["id"].as_u64().unwrap();

    let response = server
        .get("/admin/users")
        .add_cookie(session(&customer))
        .await;
    assert_eq!(response.status_code(), 403);
    let body: Value = response.json();
    assert_eq!(body, json!({ "error": "admin access required" }));

    let response = server.get("/admin/users").await;
    assert_eq!(response.status_code(), 403);

    // Customers cannot promote themselves
    let response = server
        .put(&format!("/admin/users/{id}/role"))
        .add_cookie(session(&customer))
        .json(&json!({ "role": "admin" }))
        .await;
    assert_eq!(response.status_code(), 403);
}

#[tokio::test]
async fn test_promote_user_to_admin() {
    let (server, email_sender, _store) = create_test_server();
    let admin = signup_admin(&server, &email_sender).await;
    let (customer, user) = signup(&server, "promoted@example.com", "password123").await;
    let id = user["id"].as_u64().unwrap();

    let response = server
        .put(&format!("/admin/users/{id}/role"))
        .add_cookie(session(&admin))
        .json(&json!({ "role": "admin" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["user"]["role"], "admin");

    // The new role applies to the existing session on its next request
    let response = server
        .get("/admin/users")
        .add_cookie(session(&customer))
        .await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_set_role_validation() {
    let (server, email_sender, _store) = create_test_server();
    let admin = signup_admin(&server, &email_sender).await;
    let body: Value = server.get("/me").add_cookie(session(&admin)).await.json();
    let id = body["user"]["id"].as_u64().unwrap();

    let response = server
        .put(&format!("/admin/users/{id}/role"))
        .add_cookie(session(&admin))
        .json(&json!({ "role": "superuser" }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = server
        .put("/admin/users/not-a-number/role")
        .add_cookie(session(&admin))
        .json(&json!({ "role": "user" }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = server
        .put("/admin/users/9999/role")
        .add_cookie(session(&admin))
        .json(&json!({ "role": "user" }))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_bootstrap_admin_needs_verified_email() {
    let (server, email_sender, _store) = create_test_server();
    let (cookie, user) = signup(&server, ADMIN_EMAIL, "password123").await;
    assert_eq!(user["role"], "user");

    let response = server.get("/admin/users").add_cookie(session(&cookie)).await;
    assert_eq!(response.status_code(), 403);

    let token = email_sender
        .wait_for_nth_token(EmailKind::Verification, ADMIN_EMAIL, 1)
        .await;
    let response = server
        .post("/verify-email")
        .json(&json!({ "token": token }))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = server.get("/me").add_cookie(session(&cookie)).await.json();
    assert_eq!(body["user"]["role"], "admin");

    let response = server.get("/admin/users").add_cookie(session(&cookie)).await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_verifying_other_addresses_grants_nothing() {
    let (server, email_sender, _store) = create_test_server();
    let (cookie, _) = signup(&server, "plain@example.com", "password123").await;

    let token = email_sender
        .wait_for_nth_token(EmailKind::Verification, "plain@example.com", 1)
        .await;
    server
        .post("/verify-email")
        .json(&json!({ "token": token }))
        .await;

    let response = server.get("/admin/users").add_cookie(session(&cookie)).await;
    assert_eq!(response.status_code(), 403);
}
