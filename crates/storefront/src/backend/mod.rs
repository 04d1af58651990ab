//! Client for the Comptoir commerce REST backend.
//!
//! # Architecture
//!
//! - The backend is the source of truth for every entity - NO local database
//! - One `BackendClient` (cheaply cloneable) shared through `AppState`
//! - Public catalog reads are cached in memory via `moka` (5 minute TTL by default)
//! - Authenticated calls take the visitor's bearer token per call
//!
//! # Resources
//!
//! Each resource lives in its own module as an `impl BackendClient` block:
//!
//! - `auth` - login, registration, password flows (`/auth/*`, `/users/{id}`)
//! - `products` - catalog, search, promotions, categories
//! - `favorites` - paginated user favorites (`/favorites`)
//! - `addresses` - address book (`/addresses/users/{id}`)
//! - `devis` - quote requests and documents (`/devis`, `/representatives`)
//! - `search_history` - saved searches (`/search-history`)
//! - `carts` - server-side cart persistence (`/carts/users/{id}`)
//! - `postulations` - professional account requests (`/postulations`)
//!
//! # Example
//!
//! ```rust,ignore
//! use comptoir_storefront::backend::BackendClient;
//!
//! let client = BackendClient::new(&config.backend)?;
//! let auth = client.login(&email, &password).await?;
//! let favorites = client.list_favorites(&auth.access_token, 0, 12).await?;
//! ```

mod addresses;
mod auth;
mod cache;
mod carts;
mod client;
mod devis;
mod favorites;
mod postulations;
mod products;
mod search_history;
pub mod types;

pub use client::BackendClient;
pub use devis::QuoteDocument;
pub use products::{DEFAULT_PAGE_SIZE, ProductQuery, ProductSort};
pub use types::*;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when calling the backend.
///
/// Status codes are the only taxonomy the backend offers; each branch maps to
/// one variant.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint path could not be joined to the base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// 400 - validation failure reported by the backend.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 401 - missing, invalid or expired token.
    #[error("Unauthorized")]
    Unauthorized,

    /// 403 - authenticated but not allowed.
    #[error("Forbidden")]
    Forbidden,

    /// 404 - resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// 409 - resource already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 429 - throttled by the backend.
    #[error("Rate limited, retry after {0:?} seconds")]
    RateLimited(Option<u64>),

    /// Any other non-success status.
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },
}

impl ApiError {
    /// Build the error for a non-success response.
    ///
    /// `body` is the raw response text; a JSON `message` (or `error`) field is
    /// preferred over the raw text when present.
    #[must_use]
    pub fn from_status(status: StatusCode, body: &str, path: &str, retry_after: Option<u64>) -> Self {
        let message = extract_message(body);
        match status {
            StatusCode::BAD_REQUEST => Self::BadRequest(message),
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::FORBIDDEN => Self::Forbidden,
            StatusCode::NOT_FOUND => Self::NotFound(path.to_string()),
            StatusCode::CONFLICT => Self::Conflict(message),
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited(retry_after),
            other => Self::Server {
                status: other.as_u16(),
                message,
            },
        }
    }

    /// The HTTP status the backend answered with, when there was one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest(_) => Some(400),
            Self::Unauthorized => Some(401),
            Self::Forbidden => Some(403),
            Self::NotFound(_) => Some(404),
            Self::Conflict(_) => Some(409),
            Self::RateLimited(_) => Some(429),
            Self::Server { status, .. } => Some(*status),
            Self::Http(_) | Self::Parse(_) | Self::Url(_) => None,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// French message suitable for a banner.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::BadRequest(msg) if !msg.is_empty() => msg.clone(),
            Self::BadRequest(_) => "La requête est invalide".to_string(),
            Self::Unauthorized => "Votre session a expiré, veuillez vous reconnecter".to_string(),
            Self::Forbidden => "Vous n'avez pas accès à cette ressource".to_string(),
            Self::NotFound(_) => "Ressource introuvable".to_string(),
            Self::Conflict(msg) if !msg.is_empty() => msg.clone(),
            Self::Conflict(_) => "Cette ressource existe déjà".to_string(),
            Self::RateLimited(_) => {
                "Trop de tentatives, veuillez réessayer dans quelques instants".to_string()
            }
            Self::Server { .. } | Self::Http(_) | Self::Parse(_) | Self::Url(_) => {
                "Le service est momentanément indisponible".to_string()
            }
        }
    }
}

/// Pull a human-readable message out of an error body.
fn extract_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body)
        && let Some(message) = parsed.message.or(parsed.error)
    {
        return message.trim().to_string();
    }
    body.trim().chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_branching() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"message":"Code postal invalide"}"#, "/addresses", None);
        assert!(matches!(&err, ApiError::BadRequest(m) if m == "Code postal invalide"));

        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, "", "/auth/me", None);
        assert!(err.is_unauthorized());

        let err = ApiError::from_status(StatusCode::FORBIDDEN, "", "/devis/4", None);
        assert!(matches!(err, ApiError::Forbidden));

        let err = ApiError::from_status(StatusCode::NOT_FOUND, "", "/products/99", None);
        assert!(matches!(&err, ApiError::NotFound(p) if p == "/products/99"));

        let err = ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, "", "/auth/regular-login", Some(30));
        assert!(matches!(err, ApiError::RateLimited(Some(30))));

        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream down", "/products", None);
        assert!(matches!(&err, ApiError::Server { status: 502, message } if message == "upstream down"));
    }

    #[test]
    fn test_extract_message_prefers_json_fields() {
        assert_eq!(extract_message(r#"{"error":"Email déjà utilisé"}"#), "Email déjà utilisé");
        assert_eq!(extract_message("plain text"), "plain text");
        assert_eq!(extract_message("x".repeat(500).as_str()).len(), 200);
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            ApiError::BadRequest(String::new()).user_message(),
            "La requête est invalide"
        );
        assert_eq!(
            ApiError::RateLimited(None).user_message(),
            "Trop de tentatives, veuillez réessayer dans quelques instants"
        );
        assert_eq!(ApiError::Forbidden.status(), Some(403));
    }
}
