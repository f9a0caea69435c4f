//! Notification gateway for OTP codes and password-reset links.
//!
//! Delivery is a trait seam so the orchestrator does not care whether codes
//! go out via SMTP, an HTTP provider, or (for local development) the log.
//! Dispatch failures propagate to the caller; nothing is retried here.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// What an OTP was issued for; carried through to the delivery template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OtpPurpose {
    Registration,
    Login,
}

impl OtpPurpose {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Login => "login",
        }
    }
}

/// Outbound delivery abstraction used by the session orchestrator.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Deliver an OTP code or return an error to fail the calling flow.
    async fn send_otp(&self, email: &str, code: &str, purpose: OtpPurpose) -> Result<()>;

    /// Deliver a password-reset link or return an error.
    async fn send_password_reset(&self, email: &str, reset_url: &str) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogNotifier;

#[async_trait]
impl NotificationGateway for LogNotifier {
    async fn send_otp(&self, email: &str, code: &str, purpose: OtpPurpose) -> Result<()> {
        info!(
            to_email = %email,
            purpose = purpose.as_str(),
            code = %code,
            "otp delivery stub"
        );
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, reset_url: &str) -> Result<()> {
        info!(
            to_email = %email,
            reset_url = %reset_url,
            "password reset delivery stub"
        );
        Ok(())
    }
}
