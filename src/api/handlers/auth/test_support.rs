//! In-memory store and notifier doubles shared by the auth test modules.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use uuid::Uuid;

use super::account::{Account, AccountChanges, AccountStore, NewAccount};
use super::error::StoreError;
use super::notify::{NotificationGateway, OtpPurpose};
use super::service::{AuthConfig, AuthService};
use super::tokens::TokenIssuer;

/// Mutex-backed account table with the same single-winner OTP consumption
/// semantics as the SQL store.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    pub async fn set_active(&self, id: Uuid, active: bool) {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.get_mut(&id) {
            account.is_active = active;
        }
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let now = Utc::now();
        let stored = Account {
            id: Uuid::new_v4(),
            email: account.email,
            password_hash: account.password_hash,
            first_name: account.first_name,
            last_name: account.last_name,
            is_verified: false,
            is_active: true,
            role: "user".to_string(),
            otp: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, changes: AccountChanges) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.get_mut(&id).ok_or(StoreError::NotFound)?;
        if changes.is_empty() {
            return Ok(account.clone());
        }
        if let Some(password_hash) = changes.password_hash {
            account.password_hash = password_hash;
        }
        if let Some(is_verified) = changes.is_verified {
            account.is_verified = is_verified;
        }
        if let Some(otp) = changes.otp {
            account.otp = otp;
        }
        if let Some(last_login) = changes.last_login {
            account.last_login = Some(last_login);
        }
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn consume_otp(
        &self,
        id: Uuid,
        candidate: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, StoreError> {
        // Check and clear under one lock so racing callers cannot both win.
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.get_mut(&id).ok_or(StoreError::NotFound)?;
        if !account.otp_matches(candidate, now) {
            return Ok(None);
        }
        account.otp = None;
        account.is_verified = true;
        account.updated_at = Utc::now();
        Ok(Some(account.clone()))
    }
}

#[derive(Clone, Debug)]
pub enum SentMessage {
    Otp {
        email: String,
        code: String,
        purpose: OtpPurpose,
    },
    PasswordReset {
        email: String,
        reset_url: String,
    },
}

/// Captures outbound messages so tests can read back OTP codes and reset
/// links.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_otp_code(&self) -> Option<String> {
        self.messages().iter().rev().find_map(|m| match m {
            SentMessage::Otp { code, .. } => Some(code.clone()),
            SentMessage::PasswordReset { .. } => None,
        })
    }

    pub fn last_reset_token(&self) -> Option<String> {
        self.messages().iter().rev().find_map(|m| match m {
            SentMessage::PasswordReset { reset_url, .. } => reset_url
                .split_once("token=")
                .map(|(_, token)| token.to_string()),
            SentMessage::Otp { .. } => None,
        })
    }
}

#[async_trait]
impl NotificationGateway for RecordingNotifier {
    async fn send_otp(&self, email: &str, code: &str, purpose: OtpPurpose) -> Result<()> {
        self.sent.lock().unwrap().push(SentMessage::Otp {
            email: email.to_string(),
            code: code.to_string(),
            purpose,
        });
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, reset_url: &str) -> Result<()> {
        self.sent.lock().unwrap().push(SentMessage::PasswordReset {
            email: email.to_string(),
            reset_url: reset_url.to_string(),
        });
        Ok(())
    }
}

/// Fails every dispatch, for exercising the non-atomic commit-then-notify
/// path.
pub struct FailingNotifier;

#[async_trait]
impl NotificationGateway for FailingNotifier {
    async fn send_otp(&self, _email: &str, _code: &str, _purpose: OtpPurpose) -> Result<()> {
        Err(anyhow!("email delivery unavailable"))
    }

    async fn send_password_reset(&self, _email: &str, _reset_url: &str) -> Result<()> {
        Err(anyhow!("email delivery unavailable"))
    }
}

pub fn test_store() -> Arc<MemoryAccountStore> {
    Arc::new(MemoryAccountStore::default())
}

pub fn test_issuer() -> TokenIssuer {
    TokenIssuer::new(
        &SecretString::from("test-access-secret".to_string()),
        &SecretString::from("test-refresh-secret".to_string()),
        &SecretString::from("test-reset-secret".to_string()),
    )
}

pub fn service_with(
    store: Arc<MemoryAccountStore>,
    notifier: Arc<dyn NotificationGateway>,
) -> AuthService {
    AuthService::new(
        store,
        notifier,
        test_issuer(),
        AuthConfig::new("http://localhost:3000".to_string()),
    )
}
