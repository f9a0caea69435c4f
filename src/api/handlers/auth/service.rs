//! Session orchestrator: composes the account store, token issuer, and
//! notification gateway into the register/login/reset flows.
//!
//! Per-account state machine:
//! UNVERIFIED -> (register) -> OTP pending -> (verify) -> ACTIVE;
//! ACTIVE -> (login) -> OTP pending -> (verify) -> AUTHENTICATED.
//!
//! The orchestrator holds no shared in-process mutable state beyond the
//! persisted account row. The account write and the notification dispatch are
//! independent and non-atomic: a dispatch failure in `register` fails the
//! call even though the account row is already committed.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::api::handlers::{normalize_email, valid_email};

use super::account::{Account, AccountChanges, AccountStore, NewAccount, OtpSlot};
use super::error::AuthError;
use super::notify::{NotificationGateway, OtpPurpose};
use super::otp::generate_otp;
use super::tokens::{AccessClaims, TokenIssuer, TokenPair};

pub const DEFAULT_OTP_TTL_MINUTES: i64 = 10;
pub const MIN_PASSWORD_LENGTH: usize = 8;

const DEFAULT_REFRESH_COOKIE_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_REMEMBER_ME_COOKIE_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;

pub const MSG_REGISTERED: &str =
    "Registration successful. Please check your email for the OTP to verify your account.";
pub const MSG_EMAIL_VERIFIED: &str = "Email verified successfully";
pub const MSG_OTP_SENT: &str = "OTP sent to your email. Please verify to complete login.";
pub const MSG_LOGIN_SUCCESSFUL: &str = "Login successful";
pub const MSG_RESET_REQUESTED: &str =
    "If an account with that email exists, a password reset link has been sent.";
pub const MSG_PASSWORD_RESET: &str = "Password reset successfully";

/// Orchestrator configuration.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    otp_ttl_minutes: i64,
    cookie_secure: bool,
    refresh_cookie_ttl_seconds: i64,
    remember_me_cookie_ttl_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        // Only mark cookies secure when the frontend is served over HTTPS.
        let cookie_secure = frontend_base_url.starts_with("https://");
        Self {
            frontend_base_url,
            otp_ttl_minutes: DEFAULT_OTP_TTL_MINUTES,
            cookie_secure,
            refresh_cookie_ttl_seconds: DEFAULT_REFRESH_COOKIE_TTL_SECONDS,
            remember_me_cookie_ttl_seconds: DEFAULT_REMEMBER_ME_COOKIE_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_otp_ttl_minutes(mut self, minutes: i64) -> Self {
        self.otp_ttl_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn otp_ttl_minutes(&self) -> i64 {
        self.otp_ttl_minutes
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    /// Cookie lifetime for the refresh token; `remember_me` only changes the
    /// cookie, never the token claims.
    #[must_use]
    pub fn refresh_cookie_ttl_seconds(&self, remember_me: bool) -> i64 {
        if remember_me {
            self.remember_me_cookie_ttl_seconds
        } else {
            self.refresh_cookie_ttl_seconds
        }
    }

    /// Build the frontend reset link included in outbound emails.
    #[must_use]
    pub fn build_reset_url(&self, token: &str) -> String {
        let base = self.frontend_base_url.trim_end_matches('/');
        format!("{base}/reset-password?token={token}")
    }
}

/// Registration input, pre-deserialization validation happens here.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: Option<String>,
}

/// Successful registration: account committed, OTP dispatched, no tokens yet.
#[derive(Debug)]
pub struct Registered {
    pub account: Account,
    pub message: &'static str,
}

/// Successful OTP consumption: account plus a fresh token pair.
#[derive(Debug)]
pub struct Authenticated {
    pub account: Account,
    pub tokens: TokenPair,
    pub message: &'static str,
}

/// Successful credential check: an OTP is on its way, tokens are not.
#[derive(Debug)]
pub struct LoginChallenge {
    pub account: Account,
    pub requires_otp: bool,
    pub message: &'static str,
}

/// Composes account lookup, credential/OTP checks, and token issuance.
pub struct AuthService {
    store: Arc<dyn AccountStore>,
    notifier: Arc<dyn NotificationGateway>,
    tokens: TokenIssuer,
    config: AuthConfig,
}

impl AuthService {
    #[must_use]
    pub fn new(
        store: Arc<dyn AccountStore>,
        notifier: Arc<dyn NotificationGateway>,
        tokens: TokenIssuer,
        config: AuthConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            tokens,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Create an unverified account and dispatch a registration OTP.
    ///
    /// # Errors
    ///
    /// `Validation` listing every violated rule, `EmailTaken` for a duplicate
    /// address, or `Infrastructure` when the store or dispatch fails. A
    /// dispatch failure surfaces after the account row is already committed.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<Registered, AuthError> {
        let violations = validate_registration(&input);
        if !violations.is_empty() {
            return Err(AuthError::Validation(violations));
        }

        let email = normalize_email(&input.email);
        if self.store.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = super::account::hash_password(&input.password)?;
        let account = self
            .store
            .create(NewAccount {
                email,
                password_hash,
                first_name: input.first_name.trim().to_string(),
                last_name: input
                    .last_name
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty()),
            })
            .await?;

        let (account, code) = self.issue_otp(account).await?;
        self.notifier
            .send_otp(&account.email, &code, OtpPurpose::Registration)
            .await
            .map_err(AuthError::Infrastructure)?;

        debug!(account_id = %account.id, "registration otp dispatched");
        Ok(Registered {
            account,
            message: MSG_REGISTERED,
        })
    }

    /// Consume a registration OTP and issue the first token pair.
    ///
    /// # Errors
    ///
    /// `UserNotFound` for an unknown address, `InvalidOtp` for a wrong,
    /// expired, or already-consumed code.
    #[instrument(skip(self, otp), fields(email = %email))]
    pub async fn verify_registration(
        &self,
        email: &str,
        otp: &str,
    ) -> Result<Authenticated, AuthError> {
        let email = normalize_email(email);
        let account = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let account = self
            .store
            .consume_otp(account.id, otp, Utc::now())
            .await?
            .ok_or(AuthError::InvalidOtp)?;

        let tokens = self.tokens.generate_tokens(&account)?;
        Ok(Authenticated {
            account,
            tokens,
            message: MSG_EMAIL_VERIFIED,
        })
    }

    /// Check credentials and dispatch a login OTP. Never returns tokens.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` for a missing account or wrong password (the
    /// message is identical for both), `AccountDeactivated` when inactive.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginChallenge, AuthError> {
        let email = normalize_email(email);
        let account = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !account.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        if !account.verify_password(password)? {
            return Err(AuthError::InvalidCredentials);
        }

        let (account, code) = self.issue_otp(account).await?;
        self.notifier
            .send_otp(&account.email, &code, OtpPurpose::Login)
            .await
            .map_err(AuthError::Infrastructure)?;

        debug!(account_id = %account.id, "login otp dispatched");
        Ok(LoginChallenge {
            account,
            requires_otp: true,
            message: MSG_OTP_SENT,
        })
    }

    /// Consume a login OTP, record the login, and issue a token pair.
    ///
    /// # Errors
    ///
    /// `UserNotFound` for an unknown address, `InvalidOtp` when the code does
    /// not match, expired, or was already consumed (for example by a racing
    /// verification).
    #[instrument(skip(self, otp), fields(email = %email))]
    pub async fn verify_login(&self, email: &str, otp: &str) -> Result<Authenticated, AuthError> {
        let email = normalize_email(email);
        let account = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let account = self
            .store
            .consume_otp(account.id, otp, Utc::now())
            .await?
            .ok_or(AuthError::InvalidOtp)?;

        let account = self
            .store
            .update(
                account.id,
                AccountChanges {
                    last_login: Some(Utc::now()),
                    ..AccountChanges::default()
                },
            )
            .await?;

        let tokens = self.tokens.generate_tokens(&account)?;
        Ok(Authenticated {
            account,
            tokens,
            message: MSG_LOGIN_SUCCESSFUL,
        })
    }

    /// Dispatch a reset link when the account exists; the returned message is
    /// identical either way so the endpoint cannot confirm account existence.
    ///
    /// # Errors
    ///
    /// `Infrastructure` only; an unknown address is not an error.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn forgot_password(&self, email: &str) -> Result<&'static str, AuthError> {
        let email = normalize_email(email);
        if let Some(account) = self.store.find_by_email(&email).await? {
            let token = self.tokens.generate_reset_token(account.id)?;
            let reset_url = self.config.build_reset_url(&token);
            self.notifier
                .send_password_reset(&account.email, &reset_url)
                .await
                .map_err(AuthError::Infrastructure)?;
        }
        Ok(MSG_RESET_REQUESTED)
    }

    /// Verify a reset token and persist a new password hash.
    ///
    /// Existing sessions are not invalidated: tokens are stateless, so a
    /// password change only takes effect for future logins and refreshes.
    ///
    /// # Errors
    ///
    /// `InvalidResetToken` for any token failure (bad signature, expiry,
    /// wrong `type` claim, or a vanished account), `Validation` for a weak
    /// password.
    #[instrument(skip(self, token, new_password))]
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<&'static str, AuthError> {
        let claims = self.tokens.verify_reset_token(token)?;

        if new_password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(vec![format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )]));
        }

        let account = self
            .store
            .find_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        let password_hash = super::account::hash_password(new_password)?;
        self.store
            .update(
                account.id,
                AccountChanges {
                    password_hash: Some(password_hash),
                    ..AccountChanges::default()
                },
            )
            .await?;

        Ok(MSG_PASSWORD_RESET)
    }

    /// Mint a brand-new token pair from a refresh token.
    ///
    /// The old refresh token is not revoked (stateless design); `is_active`
    /// is enforced here, which is the only revocation point short of secret
    /// rotation.
    ///
    /// # Errors
    ///
    /// `InvalidToken` for a bad token, `InactiveAccount` when the account is
    /// missing or deactivated.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.tokens.verify_refresh_token(refresh_token)?;

        let account = match self.store.find_by_id(claims.user_id).await? {
            Some(account) if account.is_active => account,
            _ => return Err(AuthError::InactiveAccount),
        };

        Ok(self.tokens.generate_tokens(&account)?)
    }

    /// Validate a bearer access token without touching the store.
    ///
    /// # Errors
    ///
    /// `InvalidToken` for any failure.
    pub fn authorize(&self, access_token: &str) -> Result<AccessClaims, AuthError> {
        self.tokens.verify_access_token(access_token)
    }

    /// Resolve a bearer access token into the current account row.
    ///
    /// # Errors
    ///
    /// `InvalidToken` for a bad token or a vanished account.
    pub async fn profile(&self, access_token: &str) -> Result<Account, AuthError> {
        let claims = self.tokens.verify_access_token(access_token)?;
        self.store
            .find_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    /// Issue (or overwrite) the single OTP slot and return the raw code.
    async fn issue_otp(&self, account: Account) -> Result<(Account, String), AuthError> {
        let code = generate_otp();
        let slot = OtpSlot {
            code: code.clone(),
            expires_at: Utc::now() + Duration::minutes(self.config.otp_ttl_minutes),
        };
        let account = self
            .store
            .update(
                account.id,
                AccountChanges {
                    otp: Some(Some(slot)),
                    ..AccountChanges::default()
                },
            )
            .await?;
        Ok((account, code))
    }
}

fn validate_registration(input: &RegisterInput) -> Vec<String> {
    // Collect every violation, not just the first.
    let mut violations = Vec::new();

    let email = input.email.trim();
    if email.is_empty() {
        violations.push("Email is required".to_string());
    } else if !valid_email(&normalize_email(email)) {
        violations.push("Invalid email address".to_string());
    }

    if input.password.is_empty() {
        violations.push("Password is required".to_string());
    } else if input.password.len() < MIN_PASSWORD_LENGTH {
        violations.push(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        ));
    }

    if input.first_name.trim().is_empty() {
        violations.push("First name is required".to_string());
    }

    violations
}
