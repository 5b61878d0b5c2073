//! Service configuration

use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::email::SmtpConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// Externally visible base URL, used to build emailed links
    pub public_url: String,

    /// SQLite database file; `None` keeps everything in memory
    pub database_path: Option<String>,

    /// Absolute session lifetime, also the cookie max-age
    pub session_ttl: Duration,

    pub reset_token_ttl: Duration,

    pub verification_token_ttl: Duration,

    /// How often expired sessions are swept
    pub sweep_interval: StdDuration,

    pub bcrypt_cost: u32,

    /// Mark the session cookie `Secure`
    pub cookie_secure: bool,

    /// Emails granted the admin role at signup
    pub admin_emails: Vec<String>,

    /// SMTP configuration; `None` logs emails to the console
    pub smtp: Option<SmtpConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            public_url: "http://localhost:3000".to_string(),
            database_path: None,
            session_ttl: Duration::days(30),
            reset_token_ttl: Duration::hours(1),
            verification_token_ttl: Duration::hours(24),
            sweep_interval: StdDuration::from_secs(60 * 60),
            bcrypt_cost: storefront_auth_core::password::DEFAULT_COST,
            cookie_secure: false,
            admin_emails: Vec::new(),
            smtp: None,
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_var(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment variable");
            None
        }
    }
}

impl Config {
    /// Build configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let production = env_var("APP_ENV").is_some_and(|v| v == "production");

        Self {
            port: env_parse("PORT").unwrap_or(defaults.port),
            public_url: env_var("PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_url),
            database_path: env_var("DATABASE_PATH"),
            session_ttl: env_parse("SESSION_TTL_DAYS")
                .map(Duration::days)
                .unwrap_or(defaults.session_ttl),
            reset_token_ttl: env_parse("RESET_TOKEN_TTL_MINUTES")
                .map(Duration::minutes)
                .unwrap_or(defaults.reset_token_ttl),
            verification_token_ttl: env_parse("VERIFICATION_TOKEN_TTL_HOURS")
                .map(Duration::hours)
                .unwrap_or(defaults.verification_token_ttl),
            sweep_interval: env_parse("SESSION_SWEEP_INTERVAL_SECS")
                .map(StdDuration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            bcrypt_cost: env_parse("BCRYPT_COST").unwrap_or(defaults.bcrypt_cost),
            cookie_secure: env_parse("COOKIE_SECURE").unwrap_or(production),
            admin_emails: env_var("ADMIN_EMAILS")
                .map(|list| parse_email_list(&list))
                .unwrap_or_default(),
            smtp: SmtpConfig::from_env(),
        }
    }

    /// The subset of configuration the request handlers consume
    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            public_url: self.public_url.clone(),
            session_ttl: self.session_ttl,
            reset_token_ttl: self.reset_token_ttl,
            verification_token_ttl: self.verification_token_ttl,
            bcrypt_cost: self.bcrypt_cost,
            cookie_secure: self.cookie_secure,
            admin_emails: self.admin_emails.clone(),
        }
    }
}

fn parse_email_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Settings threaded through the request pipeline
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub public_url: String,
    pub session_ttl: Duration,
    pub reset_token_ttl: Duration,
    pub verification_token_ttl: Duration,
    pub bcrypt_cost: u32,
    pub cookie_secure: bool,
    pub admin_emails: Vec<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Config::default().auth_settings()
    }
}

impl AuthSettings {
    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        self.admin_emails.iter().any(|admin| *admin == email)
    }

    pub fn reset_link(&self, token: &str) -> String {
        format!("{}/reset-password?token={}", self.public_url, token)
    }

    pub fn verification_link(&self, token: &str) -> String {
        format!("{}/verify-email?token={}", self.public_url, token)
    }
}
