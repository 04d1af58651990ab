//! Account route handlers.
//!
//! These routes require authentication.

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

use crate::backend::{Address, ApiError, Quote, User};
use crate::error::{AppError, Result};
use crate::filters;
use crate::messages::{Flash, MessageQuery};
use crate::middleware::RequireAuth;
use crate::services::auth::{self, AuthError, ProfileInput};
use crate::state::AppState;
use crate::views::{self, Nav};

/// Quotes listed on the overview.
const RECENT_QUOTES: usize = 3;

/// Profile display data for templates.
#[derive(Clone)]
pub struct ProfileView {
    pub email: String,
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub company_name: String,
    pub account_type: &'static str,
    pub is_pro: bool,
    pub member_since: Option<String>,
}

impl From<&User> for ProfileView {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.to_string(),
            full_name: user.full_name(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone.clone().unwrap_or_default(),
            company_name: user.company_name.clone().unwrap_or_default(),
            account_type: user.account_type.label(),
            is_pro: user.account_type.is_professional(),
            member_since: user.created_at.as_ref().map(views::date),
        }
    }
}

/// Quote row on the overview.
#[derive(Clone)]
pub struct RecentQuoteView {
    pub id: i64,
    pub reference: String,
    pub status: &'static str,
    pub total: String,
    pub date: String,
}

impl From<&Quote> for RecentQuoteView {
    fn from(quote: &Quote) -> Self {
        Self {
            id: quote.id.as_i64(),
            reference: quote.reference.clone(),
            status: quote.status.label(),
            total: quote.total_ttc.display(),
            date: views::date(&quote.created_at),
        }
    }
}

/// Default address summary.
#[derive(Clone)]
pub struct AddressSummary {
    pub recipient: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
}

impl From<&Address> for AddressSummary {
    fn from(address: &Address) -> Self {
        Self {
            recipient: address.recipient.clone(),
            street: address.street.clone(),
            postal_code: address.postal_code.clone(),
            city: address.city.clone(),
        }
    }
}

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub nav: Nav,
    pub flash: Flash,
    pub profile: ProfileView,
    pub default_address: Option<AddressSummary>,
    pub recent_quotes: Vec<RecentQuoteView>,
}

/// Profile edit page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/edit.html")]
pub struct AccountEditTemplate {
    pub nav: Nav,
    pub flash: Flash,
    pub profile: ProfileView,
}

/// Password change page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/password.html")]
pub struct PasswordTemplate {
    pub nav: Nav,
    pub flash: Flash,
}

/// Profile form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub company_name: Option<String>,
}

/// Password change form data.
#[derive(Deserialize)]
pub struct PasswordForm {
    pub current_password: String,
    pub password: String,
    pub password_confirm: String,
}

/// Display account overview page.
///
/// The profile is read fresh from the backend; the address and quote panels
/// are left empty when their calls fail.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let backend = state.backend();
    let token = &user.access_token;
    let (profile, addresses, quotes) = tokio::join!(
        backend.me(token),
        backend.list_addresses(token, user.id),
        backend.list_quotes(token, user.id)
    );
    let profile = profile?;

    let default_address = match addresses {
        Ok(addresses) => addresses
            .iter()
            .find(|a| a.is_default)
            .or_else(|| addresses.first())
            .map(AddressSummary::from),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load addresses");
            None
        }
    };

    let mut quotes = quotes.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load quotes");
        Vec::new()
    });
    quotes.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(AccountIndexTemplate {
        nav: Nav::new(Some(&user)),
        flash: query.flash(),
        profile: ProfileView::from(&profile),
        default_address,
        recent_quotes: quotes
            .iter()
            .take(RECENT_QUOTES)
            .map(RecentQuoteView::from)
            .collect(),
    })
}

/// Display the profile edit form.
#[instrument(skip(state, user))]
pub async fn edit_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let profile = state.backend().me(&user.access_token).await?;
    Ok(AccountEditTemplate {
        nav: Nav::new(Some(&user)),
        flash: query.flash(),
        profile: ProfileView::from(&profile),
    })
}

/// Handle profile form submission.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn edit(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Response {
    let input = ProfileInput {
        first_name: &form.first_name,
        last_name: &form.last_name,
        phone: form.phone.as_deref(),
        company_name: form.company_name.as_deref(),
    };

    match auth::update_profile(&session, state.backend(), &user, &input).await {
        Ok(_) => Redirect::to("/account?success=profile_updated").into_response(),
        Err(e @ AuthError::Api(ApiError::Unauthorized)) => AppError::from(e).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Profile update failed");
            Redirect::to(&format!("/account/edit?error={}", e.code())).into_response()
        }
    }
}

/// Display the password change form.
pub async fn password_page(
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    PasswordTemplate {
        nav: Nav::new(Some(&user)),
        flash: query.flash(),
    }
}

/// Handle password change form submission.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<PasswordForm>,
) -> Response {
    match auth::change_password(
        state.backend(),
        &user,
        &form.current_password,
        &form.password,
        &form.password_confirm,
    )
    .await
    {
        Ok(()) => Redirect::to("/account?success=password_changed").into_response(),
        Err(e @ AuthError::Api(ApiError::Unauthorized)) => AppError::from(e).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Password change failed");
            Redirect::to(&format!("/account/password?error={}", e.code())).into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_view_fills_blanks() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": 4,
            "email": "claire@plomberie-durand.fr",
            "firstName": "Claire",
            "lastName": "Durand",
            "accountType": "PROFESSIONNEL",
            "createdAt": "2025-03-02T10:00:00Z"
        }))
        .unwrap();
        let view = ProfileView::from(&user);
        assert_eq!(view.full_name, "Claire Durand");
        assert_eq!(view.phone, "");
        assert!(view.is_pro);
        assert_eq!(view.account_type, "Professionnel");
        assert_eq!(view.member_since.as_deref(), Some("02/03/2025"));
    }
}
