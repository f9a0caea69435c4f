//! Session endpoints: token refresh, logout, and profile, plus the refresh
//! cookie plumbing shared with the verification handlers.

use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, AUTHORIZATION, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

use super::error::ErrorBody;
use super::service::{AuthConfig, AuthService};
use super::types::{AccountView, MessageResponse, RefreshResponse};

pub(super) const REFRESH_COOKIE_NAME: &str = "refreshToken";

const MSG_TOKEN_REFRESHED: &str = "Token refreshed successfully";
const MSG_LOGGED_OUT: &str = "Logged out successfully";

#[utoipa::path(
    post,
    path = "/auth/refresh-token",
    responses(
        (status = 200, description = "New token pair issued", body = RefreshResponse),
        (status = 401, description = "Missing, invalid, or inactive refresh token", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip(headers, service))]
pub async fn refresh_token(
    headers: HeaderMap,
    service: Extension<Arc<AuthService>>,
) -> Response {
    let Some(token) = extract_refresh_cookie(&headers) else {
        return missing_credential("Refresh token required");
    };

    match service.refresh_access_token(&token).await {
        Ok(pair) => {
            // Rotate the cookie alongside the pair; the default lifetime
            // applies since rememberMe is a login-time choice.
            let mut response_headers = HeaderMap::new();
            if let Ok(cookie) = refresh_cookie(service.config(), &pair.refresh_token, false) {
                response_headers.insert(SET_COOKIE, cookie);
            }
            (
                StatusCode::OK,
                response_headers,
                Json(RefreshResponse {
                    access_token: pair.access_token,
                    message: MSG_TOKEN_REFRESHED,
                }),
            )
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Refresh cookie cleared", body = MessageResponse),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip(headers, service))]
pub async fn logout(headers: HeaderMap, service: Extension<Arc<AuthService>>) -> Response {
    let Some(token) = extract_bearer_token(&headers) else {
        return missing_credential("Access token required");
    };
    if let Err(err) = service.authorize(&token) {
        return err.into_response();
    }

    // Tokens are stateless; logout only clears the client-side cookie.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_refresh_cookie(service.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (
        StatusCode::OK,
        response_headers,
        Json(MessageResponse {
            message: MSG_LOGGED_OUT,
        }),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/auth/profile",
    responses(
        (status = 200, description = "Current account", body = AccountView),
        (status = 401, description = "Missing or invalid access token", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip(headers, service))]
pub async fn profile(headers: HeaderMap, service: Extension<Arc<AuthService>>) -> Response {
    let Some(token) = extract_bearer_token(&headers) else {
        return missing_credential("Access token required");
    };

    match service.profile(&token).await {
        Ok(account) => (StatusCode::OK, Json(AccountView::from(&account))).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Build the `HttpOnly` refresh cookie set by the verification and refresh
/// endpoints.
pub(super) fn refresh_cookie(
    config: &AuthConfig,
    token: &str,
    remember_me: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.refresh_cookie_ttl_seconds(remember_me);
    let mut cookie = format!(
        "{REFRESH_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_refresh_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{REFRESH_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_refresh_cookie(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == REFRESH_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

pub(super) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn missing_credential(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody {
            error: message.to_string(),
            details: None,
        }),
    )
        .into_response()
}
