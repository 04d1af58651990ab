//! Professional account route handlers.
//!
//! A customer applies once with a company name and SIRET; the backend team
//! reviews the request. A rejected request can be submitted again.

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

use comptoir_core::{PostulationStatus, Siret};

use crate::backend::{ApiError, Postulation, PostulationRequest};
use crate::error::Result;
use crate::filters;
use crate::messages::{Flash, MessageQuery};
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::CurrentUser;
use crate::state::AppState;
use crate::views::{self, Nav};

/// Existing request display data.
#[derive(Clone)]
pub struct PostulationView {
    pub company_name: String,
    pub siret: String,
    pub status: &'static str,
    pub date: Option<String>,
    pub is_rejected: bool,
}

impl From<&Postulation> for PostulationView {
    fn from(postulation: &Postulation) -> Self {
        Self {
            company_name: postulation.company_name.clone(),
            siret: postulation.siret.clone(),
            status: postulation.status.label(),
            date: postulation.created_at.as_ref().map(views::date),
            is_rejected: postulation.status == PostulationStatus::Rejected,
        }
    }
}

/// Professional account page template.
#[derive(Template, WebTemplate)]
#[template(path = "pro.html")]
pub struct ProTemplate {
    pub nav: Nav,
    pub flash: Flash,
    pub is_pro: bool,
    pub postulation: Option<PostulationView>,
    pub can_apply: bool,
}

/// Postulation form data.
#[derive(Debug, Default, Deserialize)]
pub struct PostulationForm {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub siret: String,
    pub activity: Option<String>,
    pub message: Option<String>,
}

fn blank_to_none(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Only customers without a request, or whose last one was refused, may apply.
fn can_apply(is_pro: bool, postulation: Option<&Postulation>) -> bool {
    !is_pro && postulation.is_none_or(|p| p.status == PostulationStatus::Rejected)
}

/// Build the backend request, or the error code to redirect with.
fn postulation_request(
    user: &CurrentUser,
    form: &PostulationForm,
) -> std::result::Result<PostulationRequest, &'static str> {
    let company_name = form.company_name.trim();
    if company_name.is_empty() {
        return Err("missing_field");
    }
    let siret = Siret::parse(&form.siret).map_err(|_| "siret")?;

    Ok(PostulationRequest {
        user_id: user.id,
        company_name: company_name.to_string(),
        siret: siret.to_string(),
        activity: blank_to_none(form.activity.as_deref()),
        message: blank_to_none(form.message.as_deref()),
    })
}

/// Display the professional account page.
///
/// When the request was approved since login, the session user is refreshed
/// so that trade pricing shows up without logging in again.
#[instrument(skip(state, session, user))]
pub async fn page(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let backend = state.backend();
    let postulation = backend
        .get_postulation(&user.access_token, user.id)
        .await?;

    let mut user = user;
    if !user.is_professional()
        && postulation
            .as_ref()
            .is_some_and(|p| p.status == PostulationStatus::Approved)
    {
        let profile = backend.me(&user.access_token).await?;
        user.refresh_profile(&profile);
        set_current_user(&session, &user).await?;
    }

    let is_pro = user.is_professional();
    Ok(ProTemplate {
        nav: Nav::new(Some(&user)),
        flash: query.flash(),
        is_pro,
        can_apply: can_apply(is_pro, postulation.as_ref()),
        postulation: postulation.as_ref().map(PostulationView::from),
    })
}

/// Submit a professional account request.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn apply(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<PostulationForm>,
) -> Result<Response> {
    let request = match postulation_request(&user, &form) {
        Ok(request) => request,
        Err(code) => return Ok(Redirect::to(&format!("/pro?error={code}")).into_response()),
    };

    let backend = state.backend();
    let existing = backend
        .get_postulation(&user.access_token, user.id)
        .await?;
    if !can_apply(user.is_professional(), existing.as_ref()) {
        return Ok(Redirect::to("/pro?error=already_applied").into_response());
    }

    match backend.create_postulation(&user.access_token, &request).await {
        Ok(postulation) => {
            tracing::info!(postulation_id = %postulation.id, "Professional account requested");
            Ok(Redirect::to("/pro?success=postulation_sent").into_response())
        }
        Err(ApiError::Conflict(_)) => Ok(Redirect::to("/pro?error=already_applied").into_response()),
        Err(ApiError::BadRequest(reason)) => {
            tracing::warn!(%reason, "Backend rejected postulation");
            Ok(Redirect::to("/pro?error=siret").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use comptoir_core::{AccountType, Email, PostulationId, UserId};

    use super::*;

    fn user() -> CurrentUser {
        CurrentUser {
            id: UserId::new(8),
            email: Email::parse("atelier@roux-chauffage.fr").unwrap(),
            first_name: "Marc".to_string(),
            last_name: "Roux".to_string(),
            account_type: AccountType::Particulier,
            access_token: SecretString::from("token"),
            refresh_token: None,
        }
    }

    fn postulation(status: PostulationStatus) -> Postulation {
        Postulation {
            id: PostulationId::new(1),
            company_name: "Roux Chauffage".to_string(),
            siret: "44306184100047".to_string(),
            activity: None,
            message: None,
            status,
            created_at: None,
        }
    }

    #[test]
    fn test_can_apply() {
        assert!(can_apply(false, None));
        assert!(can_apply(false, Some(&postulation(PostulationStatus::Rejected))));
        assert!(!can_apply(false, Some(&postulation(PostulationStatus::Pending))));
        assert!(!can_apply(true, None));
    }

    #[test]
    fn test_request_normalizes_siret() {
        let form = PostulationForm {
            company_name: " Roux Chauffage ".to_string(),
            siret: "443 061 841 00047".to_string(),
            activity: Some(String::new()),
            message: Some("Chauffagiste depuis 2004".to_string()),
        };
        let request = postulation_request(&user(), &form).unwrap();
        assert_eq!(request.company_name, "Roux Chauffage");
        assert_eq!(request.siret, "44306184100047");
        assert!(request.activity.is_none());
    }

    #[test]
    fn test_request_rejects_bad_input() {
        let mut form = PostulationForm {
            company_name: "Roux".to_string(),
            siret: "44306184100048".to_string(),
            ..PostulationForm::default()
        };
        assert_eq!(postulation_request(&user(), &form).err(), Some("siret"));

        form.company_name = "  ".to_string();
        assert_eq!(postulation_request(&user(), &form).err(), Some("missing_field"));
    }
}
