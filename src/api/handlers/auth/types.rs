//! Request and response bodies for the auth endpoints.
//!
//! Account fields cross the wire in snake_case; flow-control fields
//! (`rememberMe`, `requiresOTP`, `accessToken`) are camelCase for frontend
//! compatibility.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::account::Account;
use super::tokens::TokenPair;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
    #[serde(rename = "rememberMe", default)]
    pub remember_me: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(rename = "rememberMe", default)]
    pub remember_me: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Sanitized account projection; never carries the password hash or the OTP
/// slot.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct AccountView {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub full_name: String,
    pub is_verified: bool,
    pub is_active: bool,
    pub role: String,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            full_name: account.full_name(),
            is_verified: account.is_verified,
            is_active: account.is_active,
            role: account.role.clone(),
            last_login: account.last_login,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

#[derive(ToSchema, Serialize, Debug)]
pub struct RegisterResponse {
    pub user: AccountView,
    pub message: &'static str,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct AuthResponse {
    pub user: AccountView,
    pub tokens: TokenPair,
    pub message: &'static str,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct LoginResponse {
    pub user: AccountView,
    pub message: &'static str,
    #[serde(rename = "requiresOTP")]
    pub requires_otp: bool,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct RefreshResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    pub message: &'static str,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::account::OtpSlot;
    use super::*;

    fn account() -> Account {
        Account {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            first_name: "Alice".to_string(),
            last_name: Some("Smith".to_string()),
            is_verified: false,
            is_active: true,
            role: "user".to_string(),
            otp: Some(OtpSlot {
                code: "123456".to_string(),
                expires_at: Utc::now(),
            }),
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn account_view_never_exposes_secrets() {
        let view = AccountView::from(&account());
        let json = serde_json::to_string(&view).unwrap();

        assert!(!json.contains("password"));
        assert!(!json.contains("123456"));
        assert!(!json.contains("otp"));
        assert!(json.contains("\"full_name\":\"Alice Smith\""));
    }

    #[test]
    fn flow_fields_are_camel_case() {
        let login: LoginRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"pw","rememberMe":true}"#)
                .unwrap();
        assert!(login.remember_me);

        // rememberMe is optional and defaults to false.
        let login: LoginRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"pw"}"#).unwrap();
        assert!(!login.remember_me);

        let response = LoginResponse {
            user: AccountView::from(&account()),
            message: "ok",
            requires_otp: true,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"requiresOTP\":true"));

        let refresh = RefreshResponse {
            access_token: "jwt".to_string(),
            message: "ok",
        };
        let json = serde_json::to_string(&refresh).unwrap();
        assert!(json.contains("\"accessToken\":\"jwt\""));
    }
}
