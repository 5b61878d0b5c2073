//! Account deletion

mod common;

use common::{create_test_server, session, signup};
use serde_json::{json, Value};
use storefront_auth::store::{NewOrder, OrderStore, UserId, UserStore};

#[tokio::test]
async fn test_delete_account_with_correct_password() {
    let (server, _email_sender, store) = create_test_server();
    let (cookie, user) = signup(&server, "leaving@example.com", "password123").await;
    let user_id = UserId(user["id"].as_u64().unwrap());

    let response = server
        .delete("/account")
        .add_cookie(session(&cookie))
        .json(&json!({ "password": "password123" }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body, json!({ "ok": true }));
    let cleared = response.maybe_cookie("session").expect("Cookie not cleared");
    assert!(cleared.value().is_empty());

    assert!(store.get_user(user_id).unwrap().is_none());
    assert_eq!(store.session_count(), 0);

    let response = server
        .post("/login")
        .json(&json!({ "email": "leaving@example.com", "password": "password123" }))
        .await;
    assert_eq!(response.status_code(), 401);

    let response = server.get("/me").add_cookie(session(&cookie)).await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_delete_account_with_wrong_password() {
    let (server, _email_sender, store) = create_test_server();
    let (cookie, user) = signup(&server, "staying@example.com", "password123").await;
    let user_id = UserId(user["id"].as_u64().unwrap());

    let response = server
        .delete("/account")
        .add_cookie(session(&cookie))
        .json(&json!({ "password": "wrongpassword" }))
        .await;

    assert_eq!(response.status_code(), 401);
    assert!(store.get_user(user_id).unwrap().is_some());

    let response = server.get("/me").add_cookie(session(&cookie)).await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_delete_account_requires_session() {
    let (server, _email_sender, _store) = create_test_server();

    let response = server
        .delete("/account")
        .json(&json!({ "password": "password123" }))
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_delete_account_requires_password() {
    let (server, _email_sender, _store) = create_test_server();
    let (cookie, _) = signup(&server, "nopass@example.com", "password123").await;

    let response = server
        .delete("/account")
        .add_cookie(session(&cookie))
        .json(&json!({}))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_delete_account_keeps_anonymized_orders() {
    let (server, _email_sender, store) = create_test_server();
    let (cookie, user) = signup(&server, "buyer@example.com", "password123").await;
    let user_id = UserId(user["id"].as_u64().unwrap());

    let order = store
        .create_order(NewOrder {
            user_id: Some(user_id),
            email: Some("buyer@example.com".to_string()),
            stripe_customer_id: Some("cus_123".to_string()),
            amount_cents: 4999,
        })
        .unwrap();

    let response = server
        .delete("/account")
        .add_cookie(session(&cookie))
        .json(&json!({ "password": "password123" }))
        .await;
    assert_eq!(response.status_code(), 200);

    let order = store.get_order(order.id).unwrap().expect("Order was removed");
    assert_eq!(order.user_id, None);
    assert_eq!(order.email, None);
    assert_eq!(order.stripe_customer_id, None);
    assert_eq!(order.amount_cents, 4999);
}

#[tokio::test]
async fn test_email_can_be_reused_after_deletion() {
    let (server, _email_sender, _store) = create_test_server();
    let (cookie, _) = signup(&server, "again@example.com", "password123").await;

    server
        .delete("/account")
        .add_cookie(session(&cookie))
        .json(&json!({ "password": "password123" }))
        .await;

    signup(&server, "again@example.com", "password456").await;
}
