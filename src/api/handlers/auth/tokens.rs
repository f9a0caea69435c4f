//! Signed-token issuance and validation.
//!
//! Access, refresh, and reset tokens are stateless HS256 JWTs with a distinct
//! secret per class; validity is purely a function of signature and expiry.
//! Nothing is persisted, so revocation is only possible through secret
//! rotation or the `is_active` check the orchestrator performs at refresh
//! time.

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::account::Account;
use super::error::AuthError;

pub const ACCESS_TOKEN_TTL_SECONDS: i64 = 15 * 60;
pub const REFRESH_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
pub const RESET_TOKEN_TTL_SECONDS: i64 = 60 * 60;

const RESET_TOKEN_TYPE: &str = "password_reset";

/// Claims carried by an access token.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AccessClaims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by a refresh token.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RefreshClaims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by a password-reset token; scoped via the `type` claim.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ResetClaims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

/// An access/refresh pair, issued together and returned to the client.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    fn from_secret(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        }
    }
}

/// Creates and validates access, refresh, and reset tokens.
pub struct TokenIssuer {
    access: TokenKeys,
    refresh: TokenKeys,
    reset: TokenKeys,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    reset_ttl_seconds: i64,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(
        access_secret: &SecretString,
        refresh_secret: &SecretString,
        reset_secret: &SecretString,
    ) -> Self {
        Self {
            access: TokenKeys::from_secret(access_secret),
            refresh: TokenKeys::from_secret(refresh_secret),
            reset: TokenKeys::from_secret(reset_secret),
            access_ttl_seconds: ACCESS_TOKEN_TTL_SECONDS,
            refresh_ttl_seconds: REFRESH_TOKEN_TTL_SECONDS,
            reset_ttl_seconds: RESET_TOKEN_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_ttl_seconds = seconds;
        self
    }

    /// Issue a fresh access/refresh pair for an account.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn generate_tokens(&self, account: &Account) -> Result<TokenPair> {
        let now = Utc::now().timestamp();

        let access_claims = AccessClaims {
            user_id: account.id,
            email: account.email.clone(),
            role: account.role.clone(),
            iat: now,
            exp: now + self.access_ttl_seconds,
        };
        let access_token = encode(&Header::default(), &access_claims, &self.access.encoding)
            .context("failed to sign access token")?;

        let refresh_claims = RefreshClaims {
            user_id: account.id,
            iat: now,
            exp: now + self.refresh_ttl_seconds,
        };
        let refresh_token = encode(&Header::default(), &refresh_claims, &self.refresh.encoding)
            .context("failed to sign refresh token")?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Issue a password-reset token scoped via the `type` claim.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn generate_reset_token(&self, user_id: Uuid) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = ResetClaims {
            user_id,
            token_type: RESET_TOKEN_TYPE.to_string(),
            iat: now,
            exp: now + self.reset_ttl_seconds,
        };
        encode(&Header::default(), &claims, &self.reset.encoding)
            .context("failed to sign reset token")
    }

    /// Validate signature and expiry of an access token.
    ///
    /// # Errors
    ///
    /// Returns the uniform [`AuthError::InvalidToken`] for any failure.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, AuthError> {
        decode::<AccessClaims>(token, &self.access.decoding, &validation())
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Validate signature and expiry of a refresh token.
    ///
    /// # Errors
    ///
    /// Returns the uniform [`AuthError::InvalidToken`] for any failure.
    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        decode::<RefreshClaims>(token, &self.refresh.decoding, &validation())
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Validate a reset token, requiring the `password_reset` type claim.
    ///
    /// # Errors
    ///
    /// Returns the uniform [`AuthError::InvalidResetToken`] for any failure,
    /// including a correctly-signed token with a different `type`.
    pub fn verify_reset_token(&self, token: &str) -> Result<ResetClaims, AuthError> {
        let claims = decode::<ResetClaims>(token, &self.reset.decoding, &validation())
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidResetToken)?;
        if claims.token_type != RESET_TOKEN_TYPE {
            return Err(AuthError::InvalidResetToken);
        }
        Ok(claims)
    }
}

fn validation() -> Validation {
    // Default leeway is 60s; expiry must be exact for single-use flows.
    let mut validation = Validation::default();
    validation.leeway = 0;
    validation
}
