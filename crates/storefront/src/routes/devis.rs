//! Quote (devis) route handlers.
//!
//! A quote is requested from the current cart and addressed to a sales
//! representative. Once the request is accepted by the backend the cart is
//! emptied: its content now lives in the quote.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use comptoir_core::{QuoteId, RepresentativeId};

use crate::backend::{ApiError, Quote, QuoteItemInput, QuoteLine, QuoteRequest, Representative};
use crate::error::{AppError, Result};
use crate::filters;
use crate::messages::{Flash, MessageQuery};
use crate::middleware::RequireAuth;
use crate::routes::cart::CartView;
use crate::services::cart::{self, Cart};
use crate::state::AppState;
use crate::views::{self, Nav};

/// Longest comment forwarded to the backend, in characters.
const MAX_COMMENT_LENGTH: usize = 2000;

/// Quote row in the list.
#[derive(Clone)]
pub struct QuoteSummaryView {
    pub id: i64,
    pub reference: String,
    pub status: &'static str,
    pub total_ttc: String,
    pub date: String,
    pub has_document: bool,
}

impl From<&Quote> for QuoteSummaryView {
    fn from(quote: &Quote) -> Self {
        Self {
            id: quote.id.as_i64(),
            reference: quote.reference.clone(),
            status: quote.status.label(),
            total_ttc: quote.total_ttc.display(),
            date: views::date(&quote.created_at),
            has_document: quote.status.has_document(),
        }
    }
}

#[derive(Clone)]
pub struct QuoteLineView {
    pub product_id: i64,
    pub name: String,
    pub reference: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl From<&QuoteLine> for QuoteLineView {
    fn from(line: &QuoteLine) -> Self {
        Self {
            product_id: line.product_id.as_i64(),
            name: line.product_name.clone(),
            reference: line.reference.clone().unwrap_or_default(),
            quantity: line.quantity,
            unit_price: line.unit_price.display(),
            line_total: line.line_total.display(),
        }
    }
}

/// Full quote for the detail page.
#[derive(Clone)]
pub struct QuoteDetailView {
    pub id: i64,
    pub reference: String,
    pub status: &'static str,
    pub lines: Vec<QuoteLineView>,
    pub total_ht: String,
    pub total_ttc: String,
    pub representative: Option<String>,
    pub comment: Option<String>,
    pub date: String,
    pub valid_until: Option<String>,
    pub has_document: bool,
}

impl From<&Quote> for QuoteDetailView {
    fn from(quote: &Quote) -> Self {
        Self {
            id: quote.id.as_i64(),
            reference: quote.reference.clone(),
            status: quote.status.label(),
            lines: quote.lines.iter().map(QuoteLineView::from).collect(),
            total_ht: quote.total_ht.display(),
            total_ttc: quote.total_ttc.display(),
            representative: quote.representative.as_ref().map(Representative::full_name),
            comment: quote.comment.clone(),
            date: views::date(&quote.created_at),
            valid_until: quote.valid_until.as_ref().map(views::naive_date),
            has_document: quote.status.has_document(),
        }
    }
}

/// Representative choice in the request form.
#[derive(Clone)]
pub struct RepresentativeOption {
    pub id: i64,
    pub name: String,
    pub region: String,
}

impl From<&Representative> for RepresentativeOption {
    fn from(rep: &Representative) -> Self {
        Self {
            id: rep.id.as_i64(),
            name: rep.full_name(),
            region: rep.region.clone().unwrap_or_default(),
        }
    }
}

/// Quote list page template.
#[derive(Template, WebTemplate)]
#[template(path = "devis/index.html")]
pub struct DevisIndexTemplate {
    pub nav: Nav,
    pub flash: Flash,
    pub quotes: Vec<QuoteSummaryView>,
}

/// Quote request page template.
#[derive(Template, WebTemplate)]
#[template(path = "devis/new.html")]
pub struct DevisNewTemplate {
    pub nav: Nav,
    pub flash: Flash,
    pub cart: CartView,
    pub representatives: Vec<RepresentativeOption>,
}

/// Quote detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "devis/show.html")]
pub struct DevisShowTemplate {
    pub nav: Nav,
    pub flash: Flash,
    pub quote: QuoteDetailView,
}

/// Quote request form data. An empty representative means "any".
#[derive(Debug, Default, Deserialize)]
pub struct QuoteForm {
    pub representative_id: Option<String>,
    pub comment: Option<String>,
}

impl QuoteForm {
    fn representative(&self) -> Option<RepresentativeId> {
        self.representative_id
            .as_deref()
            .and_then(|id| id.trim().parse().ok())
    }

    fn comment(&self) -> Option<String> {
        self.comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| c.chars().take(MAX_COMMENT_LENGTH).collect())
    }
}

/// Build the backend request for the cart content.
fn quote_request(user_id: comptoir_core::UserId, cart: &Cart, form: &QuoteForm) -> QuoteRequest {
    QuoteRequest {
        client_id: user_id,
        representative_id: form.representative(),
        items: cart
            .lines()
            .iter()
            .map(|line| QuoteItemInput {
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .collect(),
        comment: form.comment(),
    }
}

/// Display the customer's quotes, newest first.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let mut quotes = state
        .backend()
        .list_quotes(&user.access_token, user.id)
        .await?;
    quotes.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(DevisIndexTemplate {
        nav: Nav::new(Some(&user)),
        flash: query.flash(),
        quotes: quotes.iter().map(QuoteSummaryView::from).collect(),
    })
}

/// Display the quote request form for the current cart.
#[instrument(skip(state, session, user))]
pub async fn new_page(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<Response> {
    let cart = cart::load(&session).await?;
    if cart.is_empty() {
        return Ok(Redirect::to("/cart?error=empty_cart").into_response());
    }

    // The form still works without the list: the backend then picks someone
    let representatives = state
        .backend()
        .list_representatives(&user.access_token)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load representatives");
            Vec::new()
        });

    Ok(DevisNewTemplate {
        nav: Nav::new(Some(&user)),
        flash: query.flash(),
        cart: CartView::from(&cart),
        representatives: representatives
            .iter()
            .map(RepresentativeOption::from)
            .collect(),
    }
    .into_response())
}

/// Submit a quote request for the current cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<QuoteForm>,
) -> Result<Response> {
    let mut cart = cart::load(&session).await?;
    if cart.is_empty() {
        return Ok(Redirect::to("/cart?error=empty_cart").into_response());
    }

    let request = quote_request(user.id, &cart, &form);
    let quote = match state
        .backend()
        .create_quote(&user.access_token, &request)
        .await
    {
        Ok(quote) => quote,
        Err(e @ (ApiError::BadRequest(_) | ApiError::NotFound(_) | ApiError::Conflict(_))) => {
            tracing::warn!(error = %e, "Quote request rejected");
            return Ok(Redirect::to("/devis/new?error=quote_failed").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(quote_id = %quote.id, reference = %quote.reference, "Quote requested");
    crate::error::add_breadcrumb(
        "devis",
        "Quote requested",
        Some(&[("reference", quote.reference.as_str())]),
    );

    cart.clear();
    cart::save(&session, state.backend(), Some(&user), &cart).await?;

    Ok(Redirect::to(&format!("/devis/{}?success=quote_sent", quote.id)).into_response())
}

/// Display one quote.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<QuoteId>,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let quote = fetch_quote(&state, &user.access_token, id).await?;
    Ok(DevisShowTemplate {
        nav: Nav::new(Some(&user)),
        flash: query.flash(),
        quote: QuoteDetailView::from(&quote),
    })
}

/// A quote of someone else is reported as missing rather than forbidden.
async fn fetch_quote(
    state: &AppState,
    token: &secrecy::SecretString,
    id: QuoteId,
) -> Result<Quote> {
    state
        .backend()
        .get_quote(token, id)
        .await
        .map_err(|e| match e {
            ApiError::Forbidden | ApiError::NotFound(_) => AppError::NotFound(format!("Devis {id}")),
            other => other.into(),
        })
}

/// Download the quote document.
#[instrument(skip(state, user))]
pub async fn document(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<QuoteId>,
) -> Result<Response> {
    let quote = fetch_quote(&state, &user.access_token, id).await?;
    let document = state
        .backend()
        .quote_document(&user.access_token, id)
        .await
        .map_err(|e| match e {
            ApiError::NotFound(_) => {
                AppError::NotFound(format!("Document du devis {}", quote.reference))
            }
            other => other.into(),
        })?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        document_filename(&quote.reference)
    );
    Ok((
        [
            (header::CONTENT_TYPE, document.content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, "private, no-store".to_string()),
        ],
        document.bytes,
    )
        .into_response())
}

/// `devis-DEV-2026-0042.pdf`; anything outside `[A-Za-z0-9-_]` becomes `_`.
fn document_filename(reference: &str) -> String {
    let safe: String = reference
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("devis-{safe}.pdf")
}

#[cfg(test)]
mod tests {
    use comptoir_core::{Price, ProductId, UserId};

    use super::*;
    use crate::services::cart::CartLine;

    fn cart() -> Cart {
        let mut cart = Cart::default();
        cart.add(CartLine {
            product_id: ProductId::new(12),
            name: "Raccord laiton 20/27".to_string(),
            reference: "RAC-2027".to_string(),
            image_url: None,
            unit_price: Price::from_cents(350),
            promo_price: None,
            quantity: 40,
        });
        cart
    }

    #[test]
    fn test_quote_request_from_cart() {
        let form = QuoteForm {
            representative_id: Some("5".to_string()),
            comment: Some("  Livraison sur chantier  ".to_string()),
        };
        let request = quote_request(UserId::new(9), &cart(), &form);
        assert_eq!(request.client_id, UserId::new(9));
        assert_eq!(request.representative_id, Some(RepresentativeId::new(5)));
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].quantity, 40);
        assert_eq!(request.comment.as_deref(), Some("Livraison sur chantier"));
    }

    #[test]
    fn test_blank_form_fields_are_omitted() {
        let form = QuoteForm {
            representative_id: Some(String::new()),
            comment: Some("   ".to_string()),
        };
        let request = quote_request(UserId::new(9), &cart(), &form);
        assert!(request.representative_id.is_none());
        assert!(request.comment.is_none());
    }

    #[test]
    fn test_document_filename_is_header_safe() {
        assert_eq!(document_filename("DEV-2026-0042"), "devis-DEV-2026-0042.pdf");
        assert_eq!(document_filename("a\"b/c"), "devis-a_b_c.pdf");
    }
}
