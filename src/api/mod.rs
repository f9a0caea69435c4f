use crate::{api::handlers::auth, cli::globals::GlobalArgs};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::auth::register::register,
        handlers::auth::register::verify_registration,
        handlers::auth::login::login,
        handlers::auth::login::verify_login,
        handlers::auth::password::forgot_password,
        handlers::auth::password::reset_password,
        handlers::auth::session::refresh_token,
        handlers::auth::session::logout,
        handlers::auth::session::profile,
    ),
    components(schemas(
        handlers::health::Health,
        handlers::auth::error::ErrorBody,
        handlers::auth::tokens::TokenPair,
        handlers::auth::types::RegisterRequest,
        handlers::auth::types::VerifyOtpRequest,
        handlers::auth::types::LoginRequest,
        handlers::auth::types::ForgotPasswordRequest,
        handlers::auth::types::ResetPasswordRequest,
        handlers::auth::types::AccountView,
        handlers::auth::types::RegisterResponse,
        handlers::auth::types::AuthResponse,
        handlers::auth::types::LoginResponse,
        handlers::auth::types::MessageResponse,
        handlers::auth::types::RefreshResponse,
    )),
    tags(
        (name = "auth", description = "Account authentication and session lifecycle"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, globals: GlobalArgs) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let issuer = auth::TokenIssuer::new(
        &globals.access_token_secret,
        &globals.refresh_token_secret,
        &globals.reset_token_secret,
    );
    let config = auth::AuthConfig::new(globals.frontend_url.clone())
        .with_otp_ttl_minutes(globals.otp_ttl_minutes);
    let service = Arc::new(auth::AuthService::new(
        Arc::new(auth::PgAccountStore::new(pool.clone())),
        Arc::new(auth::LogNotifier),
        issuer,
        config,
    ));

    let frontend_origin = frontend_origin(&globals.frontend_url)?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health::health))
        .route("/auth/register", post(auth::register::register))
        .route(
            "/auth/verify-registration",
            post(auth::register::verify_registration),
        )
        .route("/auth/login", post(auth::login::login))
        .route("/auth/verify-login", post(auth::login::verify_login))
        .route(
            "/auth/forgot-password",
            post(auth::password::forgot_password),
        )
        .route("/auth/reset-password", post(auth::password::reset_password))
        .route("/auth/refresh-token", post(auth::session::refresh_token))
        .route("/auth/logout", post(auth::session::logout))
        .route("/auth/profile", get(auth::session::profile))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(service))
                .layer(Extension(pool)),
        );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_frontend_origin_strips_path_and_keeps_port() {
        let origin = frontend_origin("http://localhost:3000/app/").unwrap();
        assert_eq!(origin, HeaderValue::from_static("http://localhost:3000"));

        let origin = frontend_origin("https://app.chiave.dev").unwrap();
        assert_eq!(origin, HeaderValue::from_static("https://app.chiave.dev"));
    }

    #[test]
    fn test_frontend_origin_rejects_invalid_urls() {
        assert!(frontend_origin("not a url").is_err());
        assert!(frontend_origin("").is_err());
    }

    #[test]
    fn test_make_span() {
        // Spans are only recorded under a subscriber, so install one locally.
        let subscriber = tracing_subscriber::Registry::default();
        tracing::subscriber::with_default(subscriber, || {
            let request = Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("x-request-id", Ulid::new().to_string())
                .body(Body::empty())
                .unwrap();
            let span = make_span(&request);
            assert_eq!(span.metadata().map(|m| m.name()), Some("http.request"));

            // No x-request-id header falls back to "none" without panicking.
            let request = Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap();
            let span = make_span(&request);
            assert_eq!(span.metadata().map(|m| m.name()), Some("http.request"));
        });
    }
}
