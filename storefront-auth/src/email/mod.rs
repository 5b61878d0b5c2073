//! Email sending abstractions

pub mod console;
pub mod smtp;

pub use console::ConsoleEmailSender;
pub use smtp::{SmtpConfig, SmtpEmailSender};

/// Trait for sending account emails.
///
/// Delivery is best effort: callers dispatch these off the request path and
/// only log failures.
pub trait EmailSender: Send + Sync {
    /// Greet a newly registered account
    fn send_welcome(&self, email: &str, name: Option<&str>) -> Result<(), String>;

    /// Send a password reset link
    fn send_password_reset(&self, email: &str, link: &str) -> Result<(), String>;

    /// Send an email verification link
    fn send_verification(&self, email: &str, link: &str) -> Result<(), String>;
}

/// Allow using Box<dyn EmailSender> as an EmailSender
impl EmailSender for Box<dyn EmailSender> {
    fn send_welcome(&self, email: &str, name: Option<&str>) -> Result<(), String> {
        (**self).send_welcome(email, name)
    }

    fn send_password_reset(&self, email: &str, link: &str) -> Result<(), String> {
        (**self).send_password_reset(email, link)
    }

    fn send_verification(&self, email: &str, link: &str) -> Result<(), String> {
        (**self).send_verification(email, link)
    }
}
