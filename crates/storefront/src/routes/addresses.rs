//! Address book route handlers.
//!
//! Mounted under `/account/addresses`; every route requires authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use comptoir_core::AddressId;

use crate::backend::{Address, AddressInput, ApiError};
use crate::error::{AppError, Result};
use crate::filters;
use crate::messages::{Flash, MessageQuery};
use crate::middleware::RequireAuth;
use crate::models::CurrentUser;
use crate::state::AppState;
use crate::views::Nav;

const INDEX_PATH: &str = "/account/addresses";

/// Address display data for templates.
#[derive(Clone)]
pub struct AddressView {
    pub id: i64,
    pub label: String,
    pub recipient: String,
    pub street: String,
    pub complement: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    pub phone: String,
    pub is_default: bool,
}

impl From<&Address> for AddressView {
    fn from(address: &Address) -> Self {
        Self {
            id: address.id.as_i64(),
            label: address.label.clone().unwrap_or_default(),
            recipient: address.recipient.clone(),
            street: address.street.clone(),
            complement: address.complement.clone().unwrap_or_default(),
            postal_code: address.postal_code.clone(),
            city: address.city.clone(),
            country: address.country.clone(),
            phone: address.phone.clone().unwrap_or_default(),
            is_default: address.is_default,
        }
    }
}

/// Address form data. `is_default` is a checkbox, present only when ticked.
#[derive(Debug, Default, Deserialize)]
pub struct AddressForm {
    pub label: Option<String>,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub street: String,
    pub complement: Option<String>,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub is_default: Option<String>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<AddressForm> for AddressInput {
    fn from(form: AddressForm) -> Self {
        Self {
            label: blank_to_none(form.label),
            recipient: form.recipient.trim().to_string(),
            street: form.street.trim().to_string(),
            complement: blank_to_none(form.complement),
            postal_code: form.postal_code.trim().to_string(),
            city: form.city.trim().to_string(),
            country: blank_to_none(form.country).unwrap_or_else(|| "France".to_string()),
            phone: blank_to_none(form.phone),
            is_default: form.is_default.is_some(),
        }
    }
}

/// Values shown in the address form.
#[derive(Clone, Default)]
pub struct AddressFormValues {
    pub label: String,
    pub recipient: String,
    pub street: String,
    pub complement: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    pub phone: String,
    pub is_default: bool,
}

impl From<&AddressInput> for AddressFormValues {
    fn from(input: &AddressInput) -> Self {
        Self {
            label: input.label.clone().unwrap_or_default(),
            recipient: input.recipient.clone(),
            street: input.street.clone(),
            complement: input.complement.clone().unwrap_or_default(),
            postal_code: input.postal_code.clone(),
            city: input.city.clone(),
            country: input.country.clone(),
            phone: input.phone.clone().unwrap_or_default(),
            is_default: input.is_default,
        }
    }
}

/// Address list page template.
#[derive(Template, WebTemplate)]
#[template(path = "addresses/index.html")]
pub struct AddressesTemplate {
    pub nav: Nav,
    pub flash: Flash,
    pub addresses: Vec<AddressView>,
}

/// Create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "addresses/form.html")]
pub struct AddressFormTemplate {
    pub nav: Nav,
    pub flash: Flash,
    /// Form target: the list for creation, the address for an update.
    pub action: String,
    pub title: &'static str,
    pub values: AddressFormValues,
}

impl AddressFormTemplate {
    fn create(user: &CurrentUser, flash: Flash, values: AddressFormValues) -> Self {
        Self {
            nav: Nav::new(Some(user)),
            flash,
            action: INDEX_PATH.to_string(),
            title: "Nouvelle adresse",
            values,
        }
    }

    fn edit(user: &CurrentUser, id: AddressId, flash: Flash, values: AddressFormValues) -> Self {
        Self {
            nav: Nav::new(Some(user)),
            flash,
            action: format!("{INDEX_PATH}/{id}"),
            title: "Modifier l'adresse",
            values,
        }
    }
}

/// Find one of the customer's addresses. Ids outside the customer's book are
/// reported as not found.
async fn owned_address(state: &AppState, user: &CurrentUser, id: AddressId) -> Result<Address> {
    state
        .backend()
        .list_addresses(&user.access_token, user.id)
        .await?
        .into_iter()
        .find(|a| a.id == id)
        .ok_or_else(|| AppError::NotFound(format!("Address {id}")))
}

/// Display the address book. The default address comes first.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let mut addresses = state
        .backend()
        .list_addresses(&user.access_token, user.id)
        .await?;
    addresses.sort_by_key(|a| !a.is_default);

    Ok(AddressesTemplate {
        nav: Nav::new(Some(&user)),
        flash: query.flash(),
        addresses: addresses.iter().map(AddressView::from).collect(),
    })
}

/// Display an empty address form.
pub async fn new_page(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    AddressFormTemplate::create(
        &user,
        Flash::default(),
        AddressFormValues {
            country: "France".to_string(),
            ..AddressFormValues::default()
        },
    )
}

/// Create an address. Invalid input re-renders the form with the message.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AddressForm>,
) -> Result<Response> {
    let input = AddressInput::from(form);
    if let Err(message) = input.validate() {
        let values = AddressFormValues::from(&input);
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            AddressFormTemplate::create(&user, Flash::error(message), values),
        )
            .into_response());
    }

    match state
        .backend()
        .create_address(&user.access_token, user.id, &input)
        .await
    {
        Ok(address) => {
            tracing::info!(address_id = %address.id, "Address created");
            Ok(Redirect::to(&format!("{INDEX_PATH}?success=address_saved")).into_response())
        }
        Err(ApiError::BadRequest(reason)) => {
            tracing::warn!(%reason, "Backend rejected address");
            Ok(Redirect::to("/account/addresses/new?error=address_invalid").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Display the edit form of an address.
#[instrument(skip(state, user))]
pub async fn edit_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let address = owned_address(&state, &user, id).await?;
    let values = AddressFormValues::from(&AddressInput::from(&address));
    Ok(AddressFormTemplate::edit(&user, id, query.flash(), values))
}

/// Update an address.
#[instrument(skip_all, fields(user_id = %user.id, address_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
    Form(form): Form<AddressForm>,
) -> Result<Response> {
    let input = AddressInput::from(form);
    if let Err(message) = input.validate() {
        let values = AddressFormValues::from(&input);
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            AddressFormTemplate::edit(&user, id, Flash::error(message), values),
        )
            .into_response());
    }

    owned_address(&state, &user, id).await?;
    match state
        .backend()
        .update_address(&user.access_token, id, &input)
        .await
    {
        Ok(_) => Ok(Redirect::to(&format!("{INDEX_PATH}?success=address_saved")).into_response()),
        Err(ApiError::BadRequest(reason)) => {
            tracing::warn!(%reason, "Backend rejected address");
            Ok(
                Redirect::to(&format!("{INDEX_PATH}/{id}/edit?error=address_invalid"))
                    .into_response(),
            )
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete an address.
#[instrument(skip(state, user))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<Redirect> {
    owned_address(&state, &user, id).await?;
    match state.backend().delete_address(&user.access_token, id).await {
        // Already gone
        Ok(()) | Err(ApiError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }
    Ok(Redirect::to(&format!("{INDEX_PATH}?success=address_deleted")))
}

/// Make an address the default one.
#[instrument(skip(state, user))]
pub async fn set_default(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<Redirect> {
    owned_address(&state, &user, id).await?;
    state
        .backend()
        .set_default_address(&user.access_token, id)
        .await?;
    Ok(Redirect::to(&format!("{INDEX_PATH}?success=address_default")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_defaults_country_and_trims() {
        let form = AddressForm {
            label: Some("  ".to_string()),
            recipient: " Atelier Roux ".to_string(),
            street: "4 impasse du Moulin".to_string(),
            postal_code: "33000".to_string(),
            city: "Bordeaux".to_string(),
            is_default: Some("on".to_string()),
            ..AddressForm::default()
        };
        let input = AddressInput::from(form);
        assert_eq!(input.recipient, "Atelier Roux");
        assert_eq!(input.label, None);
        assert_eq!(input.country, "France");
        assert!(input.is_default);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_unticked_checkbox_is_not_default() {
        let input = AddressInput::from(AddressForm::default());
        assert!(!input.is_default);
        assert!(input.validate().is_err());
    }
}
