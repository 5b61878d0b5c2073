//! Console-based email sender for development

use super::EmailSender;

/// Email sender that logs to console (for development)
pub struct ConsoleEmailSender;

impl ConsoleEmailSender {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleEmailSender {
    fn default() -> Self {
        Self::new()
    }
}

impl EmailSender for ConsoleEmailSender {
    fn send_welcome(&self, email: &str, name: Option<&str>) -> Result<(), String> {
        tracing::info!(email = %email, name = ?name, "Welcome email sent");
        Ok(())
    }

    fn send_password_reset(&self, email: &str, link: &str) -> Result<(), String> {
        println!();
        println!("========================================");
        println!("  PASSWORD RESET LINK FOR: {}", email);
        println!("  {}", link);
        println!("========================================");
        println!();

        tracing::info!(email = %email, "Password reset link sent");

        Ok(())
    }

    fn send_verification(&self, email: &str, link: &str) -> Result<(), String> {
        println!();
        println!("========================================");
        println!("  VERIFICATION LINK FOR: {}", email);
        println!("  {}", link);
        println!("========================================");
        println!();

        tracing::info!(email = %email, "Verification link sent");

        Ok(())
    }
}
