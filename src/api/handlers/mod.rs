//! API handlers and shared validation helpers.

pub mod auth;
pub mod health;

use regex::Regex;

/// Lightweight email sanity check used by the auth handlers before touching
/// the store.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Canonical form of an address: trimmed and lowercased. Lookups and unique
/// checks always operate on this form.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
