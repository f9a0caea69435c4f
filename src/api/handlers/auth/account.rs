//! Account entity, credential logic, and the store seam.
//!
//! Passwords are Argon2id-hashed (PHC string format); verification goes
//! through [`argon2::PasswordVerifier`] and is constant-time by construction.
//! The single OTP slot is modeled as `Option<OtpSlot>` so the "both null or
//! both set" invariant holds by construction rather than by convention.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use uuid::Uuid;

use super::error::StoreError;

/// The single per-account OTP slot, shared across registration and login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtpSlot {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Persistent account record.
#[derive(Clone)]
pub struct Account {
    pub id: Uuid,
    /// Stored normalized (trimmed, lowercased); unique case-insensitively.
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub role: String,
    pub otp: Option<OtpSlot>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Constant-time comparison of a plaintext candidate against the stored
    /// Argon2id hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored hash is not a valid PHC string; a
    /// mismatching password is `Ok(false)`, not an error.
    pub fn verify_password(&self, plaintext: &str) -> Result<bool> {
        let parsed = PasswordHash::new(&self.password_hash)
            .map_err(|_| anyhow!("stored password hash is not a valid PHC string"))?;
        Ok(Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok())
    }

    /// Pure OTP check: slot present, code equal, and not yet expired.
    ///
    /// Consumption (clear + mark verified) is a store operation so that the
    /// check-and-clear is atomic per row; see [`AccountStore::consume_otp`].
    #[must_use]
    pub fn otp_matches(&self, candidate: &str, now: DateTime<Utc>) -> bool {
        self.otp
            .as_ref()
            .is_some_and(|slot| slot.code == candidate && now < slot.expires_at)
    }

    /// "First Last" when both parts exist, "First" alone, else empty.
    #[must_use]
    pub fn full_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (first, Some(last)) if !first.is_empty() => format!("{first} {last}"),
            (first, _) => first.clone(),
        }
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"***")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("is_verified", &self.is_verified)
            .field("is_active", &self.is_active)
            .field("role", &self.role)
            .field("otp", &self.otp.as_ref().map(|_| "***"))
            .field("last_login", &self.last_login)
            .finish()
    }
}

/// Fields required to insert a new account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: Option<String>,
}

/// Partial update: only provided fields are persisted.
///
/// `otp: Some(None)` clears the slot; `otp: None` leaves it untouched.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub password_hash: Option<String>,
    pub is_verified: Option<bool>,
    pub otp: Option<Option<OtpSlot>>,
    pub last_login: Option<DateTime<Utc>>,
}

impl AccountChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.password_hash.is_none()
            && self.is_verified.is_none()
            && self.otp.is_none()
            && self.last_login.is_none()
    }
}

/// Hash a plaintext password with Argon2id and a fresh random salt.
///
/// # Errors
///
/// Returns an error if hashing fails.
pub fn hash_password(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|_| anyhow!("failed to hash password"))?
        .to_string();
    Ok(hash)
}

/// Persistence seam for account records.
///
/// Implementations must serialize writes per row; the orchestrator holds no
/// other shared mutable state. `update` with empty changes is a no-op that
/// returns the current row.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn update(&self, id: Uuid, changes: AccountChanges) -> Result<Account, StoreError>;

    /// Atomically consume the OTP slot: iff the stored code equals `candidate`
    /// and has not expired, clear both OTP fields, set `is_verified = true`,
    /// and return the updated row. `Ok(None)` means the code did not match; in
    /// that case the stored OTP is left untouched and remains retriable.
    async fn consume_otp(
        &self,
        id: Uuid,
        candidate: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, StoreError>;
}
