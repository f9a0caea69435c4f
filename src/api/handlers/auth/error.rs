//! Error taxonomy for the auth flows and its HTTP mapping.
//!
//! The orchestrator never swallows errors but deliberately coarsens
//! account/credential-specific causes into stable, ambiguous variants so the
//! boundary cannot be used as an account-existence or verification-state
//! oracle. The HTTP layer maps by variant, never by message text.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

/// Failures surfaced by an [`super::account::AccountStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account with this email already exists")]
    DuplicateEmail,
    #[error("account not found")]
    NotFound,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Domain errors returned by the session orchestrator.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed input; carries every violated rule, not just the first.
    #[error("Validation failed")]
    Validation(Vec<String>),

    /// Duplicate registration.
    #[error("User with this email already exists")]
    EmailTaken,

    /// Surfaced by the verification flows when the address is unknown.
    #[error("User not found")]
    UserNotFound,

    /// Identical for a missing account and a wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountDeactivated,

    /// Identical for a wrong, expired, or already-consumed code.
    #[error("Invalid or expired OTP")]
    InvalidOtp,

    /// Uniform for any access/refresh token failure.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Uniform for any reset-token failure, including a wrong `type` claim.
    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    /// Refresh rejected: account row missing or `is_active = false`.
    #[error("User not found or inactive")]
    InactiveAccount,

    /// Store or notification failure; never retried here.
    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => Self::EmailTaken,
            StoreError::NotFound => Self::UserNotFound,
            StoreError::Backend(err) => Self::Infrastructure(err),
        }
    }
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::EmailTaken
            | Self::UserNotFound
            | Self::InvalidOtp
            | Self::InvalidResetToken => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials
            | Self::AccountDeactivated
            | Self::InvalidToken
            | Self::InactiveAccount => StatusCode::UNAUTHORIZED,
            Self::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error payload returned to clients.
#[derive(ToSchema, Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Validation(violations) => ErrorBody {
                error: "Validation failed".to_string(),
                details: Some(violations),
            },
            Self::Infrastructure(err) => {
                // Internal detail stays in the logs; the body is generic.
                error!("Infrastructure error: {err:?}");
                ErrorBody {
                    error: "Internal server error".to_string(),
                    details: None,
                }
            }
            other => ErrorBody {
                error: other.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn status_maps_by_category() {
        assert_eq!(
            AuthError::Validation(vec![]).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::EmailTaken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::InvalidOtp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::InvalidResetToken.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::AccountDeactivated.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::InactiveAccount.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Infrastructure(anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_errors_coarsen_into_domain_errors() {
        assert!(matches!(
            AuthError::from(StoreError::DuplicateEmail),
            AuthError::EmailTaken
        ));
        assert!(matches!(
            AuthError::from(StoreError::NotFound),
            AuthError::UserNotFound
        ));
        assert!(matches!(
            AuthError::from(StoreError::Backend(anyhow!("down"))),
            AuthError::Infrastructure(_)
        ));
    }

    #[test]
    fn validation_body_lists_every_violation() {
        let err = AuthError::Validation(vec![
            "Email is required".to_string(),
            "Password must be at least 8 characters".to_string(),
        ]);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn credential_messages_are_identical_for_distinct_causes() {
        // Missing account and wrong password must be indistinguishable.
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
        // Wrong code, expired code, and consumed code share one message.
        assert_eq!(AuthError::InvalidOtp.to_string(), "Invalid or expired OTP");
    }
}
