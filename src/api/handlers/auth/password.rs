//! Password recovery endpoints.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

use crate::api::handlers::valid_email;

use super::error::{AuthError, ErrorBody};
use super::service::AuthService;
use super::types::{ForgotPasswordRequest, MessageResponse, ResetPasswordRequest};

#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Generic acknowledgement, identical whether the account exists or not", body = MessageResponse),
        (status = 500, description = "Dispatch failure", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip(service, payload))]
pub async fn forgot_password(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> Response {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    if !valid_email(payload.email.trim().to_lowercase().as_str()) {
        return AuthError::Validation(vec!["Invalid email address".to_string()]).into_response();
    }

    match service.forgot_password(&payload.email).await {
        Ok(message) => (StatusCode::OK, Json(MessageResponse { message })).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Invalid or expired token, or weak password", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip(service, payload))]
pub async fn reset_password(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Response {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    if payload.token.is_empty() {
        return AuthError::Validation(vec!["Token is required".to_string()]).into_response();
    }

    match service
        .reset_password(&payload.token, &payload.password)
        .await
    {
        Ok(message) => (StatusCode::OK, Json(MessageResponse { message })).into_response(),
        Err(err) => err.into_response(),
    }
}
