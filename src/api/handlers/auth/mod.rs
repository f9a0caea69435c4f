//! Account authentication and session lifecycle.
//!
//! Both registration and login are OTP-gated: credentials alone never yield
//! tokens. The flow is credentials -> one-time code by email -> token pair,
//! with the refresh token doubling as an `HttpOnly` cookie.
//!
//! Brute-force resistance for the 6-digit codes is delegated to an external
//! rate limiter in front of the service; there is no per-OTP attempt counter.

pub(crate) mod account;
pub(crate) mod error;
pub(crate) mod login;
pub(crate) mod notify;
pub(crate) mod otp;
pub(crate) mod password;
pub(crate) mod register;
pub(crate) mod service;
pub(crate) mod session;
pub(crate) mod storage;
#[cfg(test)]
pub(crate) mod test_support;
pub(crate) mod tokens;
pub(crate) mod types;

pub use account::AccountStore;
pub use error::{AuthError, ErrorBody};
pub use notify::{LogNotifier, NotificationGateway, OtpPurpose};
pub use service::{AuthConfig, AuthService, RegisterInput};
pub use storage::PgAccountStore;
pub use tokens::TokenIssuer;

use regex::Regex;

/// OTP codes are exactly six ASCII digits; anything else is rejected before
/// touching the store.
pub fn valid_otp(code: &str) -> bool {
    Regex::new(r"^\d{6}$").is_ok_and(|re| re.is_match(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_format_is_exactly_six_digits() {
        assert!(valid_otp("000000"));
        assert!(valid_otp("123456"));

        assert!(!valid_otp("12345"));
        assert!(!valid_otp("1234567"));
        assert!(!valid_otp("12345a"));
        assert!(!valid_otp(" 123456"));
        assert!(!valid_otp(""));
    }
}
