//! Common test utilities for account service integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration;

use axum_test::TestServer;
use serde_json::{json, Value};
use storefront_auth::{routes, AppState, AuthSettings, EmailSender, InMemoryStore};

pub const SESSION_COOKIE: &str = "session";
pub const ADMIN_EMAIL: &str = "owner@shop.test";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Welcome,
    PasswordReset,
    Verification,
}

/// Mock email sender that captures outgoing links
#[derive(Default, Clone)]
pub struct MockEmailSender {
    /// Captured (kind, email, link) triples; welcome emails carry an empty link
    pub sent: Arc<RwLock<Vec<(EmailKind, String, String)>>>,
}

impl MockEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, kind: EmailKind, email: &str, link: &str) {
        self.sent
            .write()
            .unwrap()
            .push((kind, email.to_string(), link.to_string()));
    }

    /// Get the last link of the given kind sent to an email
    pub fn get_link(&self, kind: EmailKind, email: &str) -> Option<String> {
        self.sent
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|(k, e, _)| *k == kind && e == email)
            .map(|(_, _, link)| link.clone())
    }

    pub fn count(&self, kind: EmailKind, email: &str) -> usize {
        self.sent
            .read()
            .unwrap()
            .iter()
            .filter(|(k, e, _)| *k == kind && e == email)
            .count()
    }

    /// Emails are sent off the request path, so poll until one shows up
    pub async fn wait_for_link(&self, kind: EmailKind, email: &str) -> String {
        for _ in 0..200 {
            if let Some(link) = self.get_link(kind, email) {
                return link;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("No {kind:?} email sent to {email}");
    }

    /// Wait for the `n`th email of a kind and return the token in its link
    pub async fn wait_for_nth_token(&self, kind: EmailKind, email: &str, n: usize) -> String {
        for _ in 0..200 {
            if self.count(kind, email) >= n {
                let link = self.get_link(kind, email).unwrap();
                return token_from_link(&link);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Fewer than {n} {kind:?} emails sent to {email}");
    }
}

impl EmailSender for MockEmailSender {
    fn send_welcome(&self, email: &str, _name: Option<&str>) -> Result<(), String> {
        self.record(EmailKind::Welcome, email, "");
        Ok(())
    }

    fn send_password_reset(&self, email: &str, link: &str) -> Result<(), String> {
        self.record(EmailKind::PasswordReset, email, link);
        Ok(())
    }

    fn send_verification(&self, email: &str, link: &str) -> Result<(), String> {
        self.record(EmailKind::Verification, email, link);
        Ok(())
    }
}

pub fn token_from_link(link: &str) -> String {
    link.split("token=")
        .nth(1)
        .expect("Link carries no token")
        .to_string()
}

/// Settings with a cheap bcrypt cost and one bootstrap admin
pub fn test_settings() -> AuthSettings {
    AuthSettings {
        public_url: "http://shop.test".to_string(),
        bcrypt_cost: 4,
        admin_emails: vec![ADMIN_EMAIL.to_string()],
        ..AuthSettings::default()
    }
}

/// Create a test server with mock email sender over an in-memory store
pub fn create_test_server() -> (TestServer, MockEmailSender, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let email_sender = MockEmailSender::new();

    let state = Arc::new(AppState::new(
        store.clone(),
        email_sender.clone(),
        test_settings(),
    ));

    let app = routes::create_router(state);
    let server = TestServer::new(app).expect("Failed to create test server");

    (server, email_sender, store)
}

pub fn session(value: &str) -> cookie::Cookie<'static> {
    cookie::Cookie::new(SESSION_COOKIE, value.to_string())
}

/// Helper to sign up and return (session cookie value, user json)
pub async fn signup(server: &TestServer, email: &str, password: &str) -> (String, Value) {
    let response = server
        .post("/signup")
        .json(&json!({ "email": email, "password": password }))
        .await;
    assert_eq!(response.status_code(), 201);

    let body: Value = response.json();
    let cookie = response
        .maybe_cookie(SESSION_COOKIE)
        .expect("No session cookie")
        .value()
        .to_string();

    (cookie, body["user"].clone())
}

/// Helper to log in and return the session cookie value
pub async fn login(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .post("/login")
        .json(&json!({ "email": email, "password": password }))
        .await;
    assert_eq!(response.status_code(), 200);

    response
        .maybe_cookie(SESSION_COOKIE)
        .expect("No session cookie")
        .value()
        .to_string()
}

/// Sign up the bootstrap admin address and verify it; returns the session cookie value
pub async fn signup_admin(server: &TestServer, email_sender: &MockEmailSender) -> String {
    let (cookie, _) = signup(server, ADMIN_EMAIL, "password123").await;
    let token = email_sender
        .wait_for_nth_token(EmailKind::Verification, ADMIN_EMAIL, 1)
        .await;

    let response = server
        .post("/verify-email")
        .json(&json!({ "token": token }))
        .await;
    assert_eq!(response.status_code(), 200);

    cookie
}
