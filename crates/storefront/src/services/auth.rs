//! Account flows on top of the backend `/auth` endpoints.
//!
//! Passwords are never stored here; the backend owns credentials. This module
//! validates input, maps backend statuses to user-facing failures and keeps the
//! session in step (cart merge, cache resets, Sentry user).

use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use comptoir_core::{Email, EmailError};

use crate::backend::{ApiError, BackendClient, ProfileUpdate, RegisterRequest, User};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::{CurrentUser, session_keys};
use crate::services::{cart, favorites, search};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Wrong email/password pair.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("email already registered")]
    EmailTaken,

    #[error("password validation failed: {0}")]
    WeakPassword(&'static str),

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("current password is wrong")]
    WrongCurrentPassword,

    #[error("invalid or expired reset token")]
    InvalidResetToken,

    #[error("too many attempts")]
    RateLimited,

    #[error("backend error: {0}")]
    Api(#[from] ApiError),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl AuthError {
    /// Short code carried in `?error=` redirects.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidEmail(_) => "email",
            Self::InvalidCredentials => "credentials",
            Self::EmailTaken => "email_taken",
            Self::WeakPassword(_) => "weak_password",
            Self::PasswordMismatch => "password_mismatch",
            Self::MissingField(_) => "missing_field",
            Self::WrongCurrentPassword => "wrong_password",
            Self::InvalidResetToken => "invalid_token",
            Self::RateLimited => "rate_limited",
            Self::Api(ApiError::Unauthorized) => "session_expired",
            Self::Api(_) => "unavailable",
            Self::Session(_) => "session",
        }
    }
}

/// Check password strength: length, at least one letter and one digit.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` describing the first unmet rule.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(
            "password must be at least 8 characters",
        ));
    }
    if !password.chars().any(char::is_alphabetic) {
        return Err(AuthError::WeakPassword("password must contain a letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AuthError::WeakPassword("password must contain a digit"));
    }
    Ok(())
}

fn validate_new_password(password: &str, confirm: &str) -> Result<(), AuthError> {
    validate_password(password)?;
    if password != confirm {
        return Err(AuthError::PasswordMismatch);
    }
    Ok(())
}

fn required(value: &str, field: &'static str) -> Result<String, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(value.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Log a customer in and prepare their session.
///
/// The session id is cycled, the guest cart merged into the saved one and
/// the favorites and search caches dropped.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` for a wrong email/password pair.
#[instrument(skip(session, backend, password))]
pub async fn login(
    session: &Session,
    backend: &BackendClient,
    email: &str,
    password: &str,
) -> Result<CurrentUser, AuthError> {
    let email = Email::parse(email)?;
    if password.is_empty() {
        return Err(AuthError::InvalidCredentials);
    }

    let auth = backend
        .login(&email, password)
        .await
        .map_err(|e| match e {
            ApiError::BadRequest(_) | ApiError::Unauthorized | ApiError::NotFound(_) => {
                AuthError::InvalidCredentials
            }
            ApiError::RateLimited(_) => AuthError::RateLimited,
            other => AuthError::Api(other),
        })?;

    let user = CurrentUser::from_auth(auth);

    session.cycle_id().await?;
    set_current_user(session, &user).await?;
    cart::sync_on_login(session, backend, &user).await?;
    favorites::reset(session).await?;
    search::reset(session).await?;

    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, "Customer logged in");

    Ok(user)
}

/// Log out. The backend call is best effort; the session is always flushed.
///
/// # Errors
///
/// Returns an error if the session store fails.
#[instrument(skip_all)]
pub async fn logout(
    session: &Session,
    backend: &BackendClient,
    user: Option<&CurrentUser>,
) -> Result<(), AuthError> {
    if let Some(user) = user
        && let Err(e) = backend.logout(&user.access_token).await
    {
        tracing::warn!(error = %e, "Backend logout failed");
    }

    clear_current_user(session).await?;
    session.flush().await?;
    clear_sentry_user();
    Ok(())
}

/// Exchange the stored refresh token for a new access token.
///
/// Returns `None` when nobody is logged in, there is no refresh token or the
/// backend refuses it; the caller then ends the session.
///
/// # Errors
///
/// Returns an error if the session store fails.
#[instrument(skip_all)]
pub async fn refresh(
    session: &Session,
    backend: &BackendClient,
) -> Result<Option<CurrentUser>, AuthError> {
    let Some(current) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await?
    else {
        return Ok(None);
    };
    let Some(refresh_token) = current.refresh_token else {
        return Ok(None);
    };

    match backend.refresh(&refresh_token).await {
        Ok(auth) => {
            let mut user = CurrentUser::from_auth(auth);
            // Backends that do not rotate refresh tokens omit it
            if user.refresh_token.is_none() {
                user.refresh_token = Some(refresh_token);
            }
            set_current_user(session, &user).await?;
            tracing::info!(user_id = %user.id, "Access token refreshed");
            Ok(Some(user))
        }
        Err(e) => {
            tracing::info!(error = %e, "Refresh token rejected");
            Ok(None)
        }
    }
}

/// Registration form input.
#[derive(Debug, Clone, Default)]
pub struct Registration<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub password_confirm: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: Option<&'a str>,
    pub company_name: Option<&'a str>,
}

/// Create an account. The customer still has to log in afterwards.
///
/// # Errors
///
/// Returns `AuthError::EmailTaken` when the email is already registered.
#[instrument(skip_all, fields(email = %input.email))]
pub async fn register(backend: &BackendClient, input: &Registration<'_>) -> Result<User, AuthError> {
    let email = Email::parse(input.email)?;
    validate_new_password(input.password, input.password_confirm)?;

    let request = RegisterRequest {
        email,
        password: input.password.to_string(),
        first_name: required(input.first_name, "first_name")?,
        last_name: required(input.last_name, "last_name")?,
        phone: optional(input.phone),
        company_name: optional(input.company_name),
    };

    backend.register(&request).await.map_err(|e| match e {
        ApiError::Conflict(_) => AuthError::EmailTaken,
        other => AuthError::Api(other),
    })
}

/// Request a reset link. Unknown emails succeed silently so the form does
/// not reveal which addresses have accounts.
///
/// # Errors
///
/// Returns `AuthError::InvalidEmail` for malformed input.
#[instrument(skip_all)]
pub async fn forgot_password(backend: &BackendClient, email: &str) -> Result<(), AuthError> {
    let email = Email::parse(email)?;
    match backend.forgot_password(&email).await {
        Ok(()) | Err(ApiError::NotFound(_)) => Ok(()),
        Err(ApiError::RateLimited(_)) => Err(AuthError::RateLimited),
        Err(e) => Err(e.into()),
    }
}

/// Set a new password from a reset link.
///
/// # Errors
///
/// Returns `AuthError::InvalidResetToken` for expired or unknown tokens.
#[instrument(skip_all)]
pub async fn reset_password(
    backend: &BackendClient,
    token: &str,
    password: &str,
    password_confirm: &str,
) -> Result<(), AuthError> {
    if token.trim().is_empty() {
        return Err(AuthError::InvalidResetToken);
    }
    validate_new_password(password, password_confirm)?;

    backend
        .reset_password(token.trim(), password)
        .await
        .map_err(|e| match e {
            ApiError::BadRequest(_) | ApiError::NotFound(_) | ApiError::Unauthorized => {
                AuthError::InvalidResetToken
            }
            other => AuthError::Api(other),
        })
}

/// Change the password of the logged-in customer.
///
/// # Errors
///
/// Returns `AuthError::WrongCurrentPassword` when the backend rejects the
/// current password.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn change_password(
    backend: &BackendClient,
    user: &CurrentUser,
    current_password: &str,
    new_password: &str,
    password_confirm: &str,
) -> Result<(), AuthError> {
    if current_password.is_empty() {
        return Err(AuthError::MissingField("current_password"));
    }
    validate_new_password(new_password, password_confirm)?;

    backend
        .change_password(&user.access_token, current_password, new_password)
        .await
        .map_err(|e| match e {
            ApiError::BadRequest(_) => AuthError::WrongCurrentPassword,
            other => AuthError::Api(other),
        })
}

/// Profile form input.
#[derive(Debug, Clone, Default)]
pub struct ProfileInput<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: Option<&'a str>,
    pub company_name: Option<&'a str>,
}

/// Update the profile and refresh the names stored in the session.
///
/// # Errors
///
/// Returns `AuthError::MissingField` for blank names, or a backend error.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    session: &Session,
    backend: &BackendClient,
    user: &CurrentUser,
    input: &ProfileInput<'_>,
) -> Result<User, AuthError> {
    let update = ProfileUpdate {
        first_name: required(input.first_name, "first_name")?,
        last_name: required(input.last_name, "last_name")?,
        phone: optional(input.phone),
        company_name: optional(input.company_name),
    };

    let updated = backend
        .update_profile(&user.access_token, user.id, &update)
        .await?;

    let mut current = user.clone();
    current.refresh_profile(&updated);
    set_current_user(session, &current).await?;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password() {
        assert!(validate_password("robinet42").is_ok());
        assert!(matches!(
            validate_password("abc1"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            validate_password("12345678"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            validate_password("robinetterie"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_validate_new_password_mismatch() {
        assert!(matches!(
            validate_new_password("robinet42", "robinet43"),
            Err(AuthError::PasswordMismatch)
        ));
        assert!(validate_new_password("robinet42", "robinet42").is_ok());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AuthError::InvalidCredentials.code(), "credentials");
        assert_eq!(AuthError::EmailTaken.code(), "email_taken");
        assert_eq!(
            AuthError::InvalidEmail(EmailError::Empty).code(),
            "email"
        );
        assert_eq!(AuthError::Api(ApiError::Unauthorized).code(), "session_expired");
        assert_eq!(
            AuthError::Api(ApiError::Server {
                status: 502,
                message: String::new()
            })
            .code(),
            "unavailable"
        );
    }

    #[test]
    fn test_optional_trims_and_drops_blank() {
        assert_eq!(optional(Some("  ")), None);
        assert_eq!(optional(Some(" 06 12 ")), Some("06 12".to_string()));
        assert_eq!(optional(None), None);
    }

    #[test]
    fn test_required_rejects_blank() {
        assert!(matches!(
            required("  ", "first_name"),
            Err(AuthError::MissingField("first_name"))
        ));
        assert_eq!(required(" Marie ", "first_name").ok().as_deref(), Some("Marie"));
    }
}
