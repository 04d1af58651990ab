//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! Without JavaScript every form falls back to a redirect to `/cart`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use comptoir_core::ProductId;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::messages::{Flash, MessageQuery};
use crate::middleware::OptionalAuth;
use crate::routes::is_htmx;
use crate::services::cart::{self, Cart, CartLine, MAX_QUANTITY};
use crate::state::AppState;
use crate::views::Nav;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_id: i64,
    pub name: String,
    pub reference: String,
    pub image_url: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
    /// Regular unit price when a promotion applies.
    pub original_price: Option<String>,
    pub line_total: String,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
    pub max_quantity: u32,
}

impl From<&CartLine> for CartItemView {
    fn from(line: &CartLine) -> Self {
        let effective = line.effective_price();
        Self {
            product_id: line.product_id.as_i64(),
            name: line.name.clone(),
            reference: line.reference.clone(),
            image_url: line.image_url.clone(),
            quantity: line.quantity,
            unit_price: effective.display(),
            original_price: (effective < line.unit_price).then(|| line.unit_price.display()),
            line_total: line.total().display(),
        }
    }
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.lines().iter().map(CartItemView::from).collect(),
            subtotal: cart.subtotal().display(),
            item_count: cart.item_count(),
            max_quantity: MAX_QUANTITY,
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub nav: Nav,
    pub flash: Flash,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX updates).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Display cart page.
#[instrument(skip(session, user))]
pub async fn show(
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let cart = cart::load(&session).await?;
    Ok(CartShowTemplate {
        nav: Nav::new(user.as_ref()),
        flash: query.flash(),
        cart: CartView::from(&cart),
    })
}

/// Answer a cart mutation: the items fragment for HTMX, a redirect otherwise.
fn cart_response(headers: &HeaderMap, cart: &Cart) -> Response {
    if is_htmx(headers) {
        (
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartItemsTemplate {
                cart: CartView::from(cart),
            },
        )
            .into_response()
    } else {
        Redirect::to("/cart").into_response()
    }
}

/// Add item to cart.
///
/// The product is looked up so the cart can show its name and price without
/// another backend call.
#[instrument(skip(state, session, user, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let product = state.backend().get_product(form.product_id).await?;
    if !product.stock_status().is_available() {
        return Err(AppError::BadRequest(format!(
            "« {} » est en rupture de stock",
            product.name
        )));
    }

    let mut cart = cart::load(&session).await?;
    cart.add(CartLine::from_product(&product, form.quantity.unwrap_or(1)));
    cart::save(&session, state.backend(), user.as_ref(), &cart).await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", form.product_id.to_string().as_str())]),
    );

    if is_htmx(&headers) {
        // Product pages only need the badge to refresh
        Ok((
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartCountTemplate {
                count: cart.item_count(),
            },
        )
            .into_response())
    } else {
        Ok(Redirect::to("/cart").into_response())
    }
}

/// Update cart item quantity. Zero removes the line.
#[instrument(skip(state, session, user, headers))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let mut cart = cart::load(&session).await?;
    if cart.set_quantity(form.product_id, form.quantity) {
        cart::save(&session, state.backend(), user.as_ref(), &cart).await?;
    }
    Ok(cart_response(&headers, &cart))
}

/// Remove item from cart.
#[instrument(skip(state, session, user, headers))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let mut cart = cart::load(&session).await?;
    if cart.remove(form.product_id) {
        cart::save(&session, state.backend(), user.as_ref(), &cart).await?;
    }
    Ok(cart_response(&headers, &cart))
}

/// Empty the cart.
#[instrument(skip(state, session, user, headers))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    headers: HeaderMap,
) -> Result<Response> {
    let mut cart = cart::load(&session).await?;
    cart.clear();
    cart::save(&session, state.backend(), user.as_ref(), &cart).await?;
    Ok(cart_response(&headers, &cart))
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> Result<impl IntoResponse> {
    let cart = cart::load(&session).await?;
    Ok(CartCountTemplate {
        count: cart.item_count(),
    })
}
