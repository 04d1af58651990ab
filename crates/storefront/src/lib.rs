//! Comptoir Storefront library.
//!
//! Server-rendered storefront for a B2B building-supplies catalog. Every
//! entity lives in the commerce REST backend; this crate renders pages, keeps
//! per-visitor state in the session and forwards customer actions.
//!
//! The router is built here so that the binary and the integration tests
//! serve exactly the same application.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod filters;
pub mod messages;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod views;

use axum::{Router, extract::State, http::StatusCode, middleware::from_fn, routing::get};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::state::AppState;

/// Directory of the stylesheet and scripts served under `/static`.
const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Build the complete storefront application.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()`: the
/// auth rate limiter falls back to the peer address when no proxy header is
/// present.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(from_fn(middleware::session_expiry_middleware))
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(session_layer)
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the backend is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.backend().ping().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use url::Url;

    use super::*;
    use crate::config::{BackendConfig, SentryConfig, StorefrontConfig};

    fn test_app() -> Router {
        let config = StorefrontConfig {
            host: [127, 0, 0, 1].into(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            // Nothing listens here; these routes never call the backend
            backend: BackendConfig::new(Url::parse("http://127.0.0.1:9").unwrap()),
            session_expiry_hours: 1,
            sentry: SentryConfig::default(),
        };
        app(AppState::new(config).unwrap())
    }

    async fn get(path: &str) -> axum::response::Response {
        test_app()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(get("/health").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_static_stylesheet_is_served() {
        let response = get("/static/css/main.css").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok()),
            Some("text/css")
        );
    }

    #[tokio::test]
    async fn test_guest_cart_page_renders() {
        let response = get("/cart").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }
}
