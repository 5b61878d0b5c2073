//! SMTP delivery for production

use std::fmt;

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};

use super::EmailSender;

/// Port for implicit TLS; any other port negotiates STARTTLS
const IMPLICIT_TLS_PORT: u16 = 465;

/// Configuration for SMTP email sending
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Password or provider API key
    pub password: String,
    pub from_email: String,
    pub from_name: Option<String>,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .finish()
    }
}

impl SmtpConfig {
    /// Read `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD` and `SMTP_FROM_EMAIL`
    /// (all required, non-empty) plus optional `SMTP_PORT` (default 465) and
    /// `SMTP_FROM_NAME`. Returns `None` when any required variable is missing.
    pub fn from_env() -> Option<Self> {
        fn non_empty(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|s| !s.trim().is_empty())
        }

        Some(Self {
            host: non_empty("SMTP_HOST")?,
            username: non_empty("SMTP_USERNAME")?,
            password: non_empty("SMTP_PASSWORD")?,
            from_email: non_empty("SMTP_FROM_EMAIL")?,
            port: non_empty("SMTP_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(IMPLICIT_TLS_PORT),
            from_name: non_empty("SMTP_FROM_NAME"),
        })
    }
}

/// SMTP email sender for production use
pub struct SmtpEmailSender {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpEmailSender {
    /// Build the transport and check that the relay accepts our credentials
    pub fn new(config: SmtpConfig) -> Result<Self, String> {
        let from_address = match &config.from_name {
            Some(name) => format!("{} <{}>", name, config.from_email),
            None => config.from_email.clone(),
        };
        let from: Mailbox = from_address
            .parse()
            .map_err(|e| format!("Invalid from address: {}", e))?;

        let builder = if config.port == IMPLICIT_TLS_PORT {
            SmtpTransport::relay(&config.host)
        } else {
            SmtpTransport::starttls_relay(&config.host)
        }
        .map_err(|e| format!("Failed to create SMTP transport: {}", e))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(config.username, config.password))
            .build();

        transport
            .test_connection()
            .map_err(|e| format!("SMTP connection test failed: {}", e))?;

        tracing::info!(host = %config.host, port = config.port, "SMTP connection established");

        Ok(Self { transport, from })
    }

    fn send_email(&self, to: &str, subject: &str, body: String) -> Result<(), String> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| format!("Invalid to address: {}", e))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| format!("Failed to build email: {}", e))?;

        self.transport
            .send(&message)
            .map_err(|e| format!("Failed to send email: {}", e))?;

        Ok(())
    }
}

impl EmailSender for SmtpEmailSender {
    fn send_welcome(&self, email: &str, name: Option<&str>) -> Result<(), String> {
        let greeting = match name {
            Some(name) => format!("Hi {},", name),
            None => "Hi,".to_string(),
        };
        let body = format!(
            "{}\n\n\
             Thanks for signing up. Your account is ready.\n\n\
             We've sent a separate email so you can confirm this address.",
            greeting
        );

        self.send_email(email, "Welcome aboard", body)?;
        tracing::info!(email = %email, "Welcome email sent");
        Ok(())
    }

    fn send_password_reset(&self, email: &str, link: &str) -> Result<(), String> {
        let subject = "Reset your password";
        let body = format!(
            "Someone asked to reset the password for this account.\n\n\
             Follow this link within the hour to choose a new one:\n{}\n\n\
             If you didn't request this, you can safely ignore this email.",
            link
        );

        self.send_email(email, subject, body)?;
        tracing::info!(email = %email, "Password reset email sent");
        Ok(())
    }

    fn send_verification(&self, email: &str, link: &str) -> Result<(), String> {
        let subject = "Confirm your email address";
        let body = format!(
            "Follow this link to confirm your email address:\n{}\n\n\
             The link is valid for 24 hours.\n\n\
             If you didn't create an account, you can safely ignore this email.",
            link
        );

        self.send_email(email, subject, body)?;
        tracing::info!(email = %email, "Verification email sent");
        Ok(())
    }
}
