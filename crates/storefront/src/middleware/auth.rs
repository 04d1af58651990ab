//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a logged-in customer in route handlers.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{HeaderValue, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Header htmx sends with every request it issues.
pub const HX_REQUEST: &str = "hx-request";

/// Extractor that requires a logged-in customer.
///
/// If nobody is logged in, redirects to the login page with a `next` parameter
/// pointing back to the requested page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Bonjour {}", user.first_name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but nobody is logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page (full page requests).
    RedirectToLogin { next: String },
    /// 401 with an `HX-Redirect` so htmx navigates the whole page.
    HtmxRedirect { next: String },
    /// Session layer missing.
    Unauthorized,
}

/// Login URL that returns to `next` afterwards.
#[must_use]
pub fn login_url(next: &str) -> String {
    if next.is_empty() || next == "/" {
        "/auth/login".to_string()
    } else {
        format!("/auth/login?next={}", urlencoding::encode(next))
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next } => Redirect::to(&login_url(&next)).into_response(),
            Self::HtmxRedirect { next } => {
                let mut response = StatusCode::UNAUTHORIZED.into_response();
                if let Ok(value) = HeaderValue::from_str(&login_url(&next)) {
                    response.headers_mut().insert("hx-redirect", value);
                }
                response
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        let user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| {
                let is_htmx = parts.headers.contains_key(HX_REQUEST);
                // htmx fragments redirect back to the page they were loaded from
                let next = if is_htmx {
                    parts
                        .headers
                        .get("hx-current-url")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|url| url::Url::parse(url).ok())
                        .map_or_else(String::new, |url| url.path().to_string())
                } else {
                    // Nested routers strip their prefix from `parts.uri`
                    let uri = parts
                        .extensions
                        .get::<OriginalUri>()
                        .map_or(&parts.uri, |original| &original.0);
                    uri.path_and_query()
                        .map_or_else(String::new, ToString::to_string)
                };
                if is_htmx {
                    AuthRejection::HtmxRedirect { next }
                } else {
                    AuthRejection::RedirectToLogin { next }
                }
            })?;

        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current customer.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Store the logged-in customer in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Remove the customer from the session (logout, expired token).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_url_encodes_next() {
        assert_eq!(login_url(""), "/auth/login");
        assert_eq!(login_url("/"), "/auth/login");
        assert_eq!(
            login_url("/devis?page=2"),
            "/auth/login?next=%2Fdevis%3Fpage%3D2"
        );
    }

    #[test]
    fn test_htmx_rejection_sets_hx_redirect() {
        let response = AuthRejection::HtmxRedirect {
            next: "/favorites".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("hx-redirect").and_then(|v| v.to_str().ok()),
            Some("/auth/login?next=%2Ffavorites")
        );
    }

    #[test]
    fn test_page_rejection_redirects() {
        let response = AuthRejection::RedirectToLogin {
            next: "/account".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
}
