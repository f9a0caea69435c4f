//! Login endpoints.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

use crate::api::handlers::valid_email;

use super::error::{AuthError, ErrorBody};
use super::service::AuthService;
use super::session::refresh_cookie;
use super::types::{AccountView, AuthResponse, LoginRequest, LoginResponse, VerifyOtpRequest};
use super::valid_otp;

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted, OTP dispatched", body = LoginResponse),
        (status = 401, description = "Invalid credentials or deactivated account", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip(service, payload))]
pub async fn login(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<LoginRequest>>,
) -> Response {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let mut violations = Vec::new();
    if !valid_email(payload.email.trim().to_lowercase().as_str()) {
        violations.push("Invalid email address".to_string());
    }
    if payload.password.is_empty() {
        violations.push("Password is required".to_string());
    }
    if !violations.is_empty() {
        return AuthError::Validation(violations).into_response();
    }

    match service.login(&payload.email, &payload.password).await {
        Ok(challenge) => (
            StatusCode::OK,
            Json(LoginResponse {
                user: AccountView::from(&challenge.account),
                message: challenge.message,
                requires_otp: challenge.requires_otp,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/verify-login",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Login complete, tokens issued", body = AuthResponse),
        (status = 400, description = "Malformed, wrong, or expired OTP", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip(service, payload))]
pub async fn verify_login(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> Response {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    if !valid_otp(&payload.otp) {
        return AuthError::Validation(vec!["OTP must be a 6-digit number".to_string()])
            .into_response();
    }

    match service.verify_login(&payload.email, &payload.otp).await {
        Ok(authenticated) => {
            let mut response_headers = HeaderMap::new();
            if let Ok(cookie) = refresh_cookie(
                service.config(),
                &authenticated.tokens.refresh_token,
                payload.remember_me,
            ) {
                response_headers.insert(SET_COOKIE, cookie);
            }
            (
                StatusCode::OK,
                response_headers,
                Json(AuthResponse {
                    user: AccountView::from(&authenticated.account),
                    tokens: authenticated.tokens,
                    message: authenticated.message,
                }),
            )
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}
