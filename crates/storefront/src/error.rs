//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::backend::ApiError;
use crate::filters;
use crate::services::auth::AuthError;
use crate::views::Nav;

/// Where an expired backend token sends the visitor.
pub const SESSION_EXPIRED_PATH: &str = "/auth/expired";

/// Marks a response as a backend token rejection, for
/// [`session_expiry_middleware`](crate::middleware::session_expiry_middleware).
#[derive(Debug, Clone, Copy)]
pub struct SessionExpired;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend call failed.
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    /// Account operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error page template.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub nav: Nav,
    pub status: u16,
    pub title: &'static str,
    pub message: String,
}

impl AppError {
    /// Backend reported the bearer token as invalid or expired.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(
            self,
            Self::Api(ApiError::Unauthorized) | Self::Auth(AuthError::Api(ApiError::Unauthorized))
        )
    }

    fn status(&self) -> StatusCode {
        let api_status = |err: &ApiError| match err {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Server { .. } | ApiError::Http(_) | ApiError::Parse(_) | ApiError::Url(_) => {
                StatusCode::BAD_GATEWAY
            }
        };

        match self {
            Self::Api(err) | Self::Auth(AuthError::Api(err)) => api_status(err),
            Self::Auth(AuthError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            Self::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            Self::Auth(AuthError::EmailTaken) => StatusCode::CONFLICT,
            Self::Auth(AuthError::Session(_)) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Auth(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    // Don't expose internal error details to clients
    fn user_message(&self) -> String {
        match self {
            Self::Api(err) | Self::Auth(AuthError::Api(err)) => err.user_message(),
            Self::Auth(err) => crate::messages::error_message(err.code()).to_string(),
            Self::NotFound(_) => "Cette page n'existe pas ou a été déplacée".to_string(),
            Self::BadRequest(message) => message.clone(),
            Self::Session(_) | Self::Internal(_) => {
                "Une erreur interne est survenue, veuillez réessayer".to_string()
            }
        }
    }
}

const fn title_for(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "Requête invalide",
        401 | 403 => "Accès refusé",
        404 => "Page introuvable",
        409 => "Conflit",
        429 => "Trop de requêtes",
        502 => "Service indisponible",
        _ => "Erreur",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_session_expired() {
            tracing::info!("Backend token rejected, ending session");
            let mut response = Redirect::to(SESSION_EXPIRED_PATH).into_response();
            response.extensions_mut().insert(SessionExpired);
            return response;
        }

        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let template = ErrorTemplate {
            nav: Nav::default(),
            status: status.as_u16(),
            title: title_for(status),
            message: self.user_message(),
        };

        (status, template).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
