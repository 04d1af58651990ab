//! Authentication route handlers.
//!
//! Handles login, registration, password reset and logout against the
//! backend `/auth` endpoints. Failures redirect back with `?error=<code>`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::SESSION_EXPIRED_PATH;
use crate::filters;
use crate::messages::{Flash, MessageQuery};
use crate::middleware::OptionalAuth;
use crate::services::auth::{self, Registration};
use crate::state::AppState;
use crate::views::Nav;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub company_name: Option<String>,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Reset password form data.
#[derive(Deserialize)]
pub struct ResetPasswordForm {
    pub token: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Login page query: banners plus where to go afterwards.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
    pub success: Option<String>,
    pub next: Option<String>,
}

/// Query of `/auth/expired`.
#[derive(Debug, Default, Deserialize)]
pub struct ExpiredQuery {
    pub next: Option<String>,
}

/// Query of the link sent by the reset email.
#[derive(Debug, Default, Deserialize)]
pub struct ResetQuery {
    pub token: Option<String>,
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub flash: Flash,
    pub next: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub nav: Nav,
    pub flash: Flash,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub nav: Nav,
    pub flash: Flash,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub nav: Nav,
    pub flash: Flash,
    pub token: String,
}

/// Only same-site paths are followed after login.
fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.starts_with("/\\"))
}

fn login_redirect(code: &str, next: Option<&str>) -> Response {
    let url = match safe_next(next) {
        Some(next) => format!(
            "/auth/login?error={code}&next={}",
            urlencoding::encode(next)
        ),
        None => format!("/auth/login?error={code}"),
    };
    Redirect::to(&url).into_response()
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<LoginQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/account").into_response();
    }
    let flash = MessageQuery {
        error: query.error,
        success: query.success,
    }
    .flash();

    LoginTemplate {
        nav: Nav::default(),
        flash,
        next: safe_next(query.next.as_deref()).unwrap_or_default().to_string(),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    match auth::login(&session, state.backend(), &form.email, &form.password).await {
        Ok(_) => {
            let target = safe_next(form.next.as_deref()).unwrap_or("/account");
            Redirect::to(target).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            login_redirect(e.code(), form.next.as_deref())
        }
    }
}

/// Handle a backend token rejection.
///
/// A stored refresh token gets one chance to renew the session, sending the
/// visitor on to `next`, the page the rejected request came from. Otherwise
/// the session ends.
#[instrument(skip_all)]
pub async fn session_expired(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ExpiredQuery>,
) -> Response {
    match auth::refresh(&session, state.backend()).await {
        Ok(Some(_)) => {
            let target = safe_next(query.next.as_deref())
                .filter(|path| !path.starts_with(SESSION_EXPIRED_PATH))
                .unwrap_or("/");
            return Redirect::to(target).into_response();
        }
        Ok(None) => {}
        Err(e) => tracing::error!(error = %e, "Failed to refresh session"),
    }

    if let Err(e) = auth::logout(&session, state.backend(), None).await {
        tracing::error!(error = %e, "Failed to clear expired session");
    }
    login_redirect("session_expired", query.next.as_deref())
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    RegisterTemplate {
        nav: Nav::default(),
        flash: query.flash(),
    }
}

/// Handle registration form submission.
///
/// The customer logs in afterwards; registration does not open a session.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    let input = Registration {
        email: &form.email,
        password: &form.password,
        password_confirm: &form.password_confirm,
        first_name: &form.first_name,
        last_name: &form.last_name,
        phone: form.phone.as_deref(),
        company_name: form.company_name.as_deref(),
    };

    match auth::register(state.backend(), &input).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "Account created");
            Redirect::to("/auth/login?success=registered").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            Redirect::to(&format!("/auth/register?error={}", e.code())).into_response()
        }
    }
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    ForgotPasswordTemplate {
        nav: Nav::default(),
        flash: query.flash(),
    }
}

/// Handle forgot password form submission.
///
/// Unknown emails show the same confirmation as known ones.
#[instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Form(form): Form<ForgotPasswordForm>,
) -> Response {
    match auth::forgot_password(state.backend(), &form.email).await {
        Ok(()) => Redirect::to("/auth/forgot-password?success=reset_sent").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Password recovery request failed");
            Redirect::to(&format!("/auth/forgot-password?error={}", e.code())).into_response()
        }
    }
}

/// Display the reset password page, reached from the email link.
pub async fn reset_password_page(Query(query): Query<ResetQuery>) -> Response {
    match query.token.filter(|t| !t.trim().is_empty()) {
        Some(token) => ResetPasswordTemplate {
            nav: Nav::default(),
            flash: MessageQuery {
                error: query.error,
                success: None,
            }
            .flash(),
            token,
        }
        .into_response(),
        None => Redirect::to("/auth/forgot-password?error=invalid_token").into_response(),
    }
}

/// Handle reset password form submission.
#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    match auth::reset_password(
        state.backend(),
        &form.token,
        &form.password,
        &form.password_confirm,
    )
    .await
    {
        Ok(()) => Redirect::to("/auth/login?success=password_reset").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Password reset failed");
            let redirect_url = format!(
                "/auth/reset-password?token={}&error={}",
                urlencoding::encode(&form.token),
                e.code()
            );
            Redirect::to(&redirect_url).into_response()
        }
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Response {
    if let Err(e) = auth::logout(&session, state.backend(), user.as_ref()).await {
        tracing::error!(error = %e, "Failed to clear session");
    }
    Redirect::to("/auth/login?success=logged_out").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next_rejects_external_targets() {
        assert_eq!(safe_next(Some("/devis/3")), Some("/devis/3"));
        assert_eq!(safe_next(Some("//evil.example")), None);
        assert_eq!(safe_next(Some("/\\evil.example")), None);
        assert_eq!(safe_next(Some("https://evil.example")), None);
        assert_eq!(safe_next(None), None);
    }

    #[test]
    fn test_login_redirect_keeps_next() {
        let response = login_redirect("credentials", Some("/favorites"));
        assert_eq!(
            response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok()),
            Some("/auth/login?error=credentials&next=%2Ffavorites")
        );
    }
}
