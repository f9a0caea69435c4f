//! Registration endpoints.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::error::{AuthError, ErrorBody};
use super::service::{AuthService, RegisterInput};
use super::session::refresh_cookie;
use super::types::{AccountView, AuthResponse, RegisterRequest, RegisterResponse, VerifyOtpRequest};
use super::valid_otp;

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, OTP dispatched", body = RegisterResponse),
        (status = 400, description = "Validation failure or duplicate email", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip(service, payload))]
pub async fn register(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<RegisterRequest>>,
) -> Response {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    match service
        .register(RegisterInput {
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
        })
        .await
    {
        Ok(registered) => (
            StatusCode::CREATED,
            Json(RegisterResponse {
                user: AccountView::from(&registered.account),
                message: registered.message,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/verify-registration",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Email verified, tokens issued", body = AuthResponse),
        (status = 400, description = "Malformed, wrong, or expired OTP", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip(service, payload))]
pub async fn verify_registration(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> Response {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    // Format is checked here so a malformed code never reaches the store.
    if !valid_otp(&payload.otp) {
        return AuthError::Validation(vec!["OTP must be a 6-digit number".to_string()])
            .into_response();
    }

    match service
        .verify_registration(&payload.email, &payload.otp)
        .await
    {
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
