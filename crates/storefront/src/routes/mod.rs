//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//! GET  /health                 - Liveness
//! GET  /health/ready           - Backend reachability
//!
//! # Catalog
//! GET  /products               - Product listing (page, category, sort)
//! GET  /products/{id}          - Product detail
//! GET  /promotions             - Products on promotion
//!
//! # Search
//! GET  /search                 - Results page (records history)
//! GET  /search/suggest         - Suggestions fragment (HTMX, debounced)
//! GET  /search/history         - History fragment (HTMX)
//! POST /search/history/{id}/delete
//! POST /search/history/clear
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (returns badge, triggers cart-updated)
//! POST /cart/update            - Update quantity (returns cart_items fragment)
//! POST /cart/remove            - Remove item (returns cart_items fragment)
//! POST /cart/clear             - Empty the cart
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Favorites (requires auth, except the badge)
//! GET  /favorites              - Favorites page
//! GET  /favorites/more         - Next page fragment (HTMX)
//! POST /favorites/toggle       - Heart button (HTMX)
//! GET  /favorites/count        - Favorites badge (fragment)
//!
//! # Auth
//! GET|POST /auth/login, /auth/register, /auth/forgot-password, /auth/reset-password
//! POST /auth/logout
//! GET  /auth/expired           - Token refresh, or session end, after a backend 401
//!
//! # Account (requires auth)
//! GET      /account            - Profile overview
//! GET|POST /account/edit       - Profile update
//! GET|POST /account/password   - Password change
//! GET|POST /account/addresses  - Address list / create
//! GET      /account/addresses/new
//! GET      /account/addresses/{id}/edit
//! POST     /account/addresses/{id}
//! POST     /account/addresses/{id}/delete
//! POST     /account/addresses/{id}/default
//!
//! # Quotes (requires auth)
//! GET      /devis              - Quotes of the customer
//! GET|POST /devis/new          - Request a quote for the cart
//! GET      /devis/{id}         - Quote detail
//! GET      /devis/{id}/pdf     - Quote document
//!
//! # Professional account (requires auth)
//! GET|POST /pro
//! ```

pub mod account;
pub mod addresses;
pub mod auth;
pub mod cart;
pub mod devis;
pub mod favorites;
pub mod home;
pub mod pro;
pub mod products;
pub mod search;

use std::collections::HashSet;

use axum::{
    Router,
    http::HeaderMap,
    routing::{get, post},
};
use tower_sessions::Session;

use comptoir_core::ProductId;

use crate::backend::BackendClient;
use crate::middleware::{HX_REQUEST, auth_rate_limiter};
use crate::models::CurrentUser;
use crate::services;
use crate::state::AppState;

/// Whether the request was issued by htmx.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key(HX_REQUEST)
}

/// Product ids the visitor has bookmarked, for heart buttons on listings.
///
/// Empty for guests. Failures are logged: a listing still renders without
/// hearts filled in.
#[derive(Debug, Default)]
pub struct FavoriteIds(HashSet<ProductId>);

impl FavoriteIds {
    pub async fn load(session: &Session, backend: &BackendClient, user: Option<&CurrentUser>) -> Self {
        let Some(user) = user else {
            return Self::default();
        };
        match services::favorites::ensure_loaded(session, backend, user).await {
            Ok(state) => Self(state.items().iter().map(|f| f.product_id).collect()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load favorites for listing");
                Self::default()
            }
        }
    }

    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.0.contains(&product_id)
    }
}

/// Create the auth routes router.
///
/// Form posts are rate limited per client IP.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/forgot-password", get(auth::forgot_password_page))
        .route("/reset-password", get(auth::reset_password_page))
        .route("/logout", post(auth::logout))
        .route("/expired", get(auth::session_expired))
        .merge(limited)
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the search routes router.
pub fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(search::results))
        .route("/suggest", get(search::suggest))
        .route("/history", get(search::history))
        .route("/history/clear", post(search::clear_history))
        .route("/history/{id}/delete", post(search::delete_history))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the favorites routes router.
pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(favorites::index))
        .route("/more", get(favorites::more))
        .route("/toggle", post(favorites::toggle))
        .route("/count", get(favorites::count))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/edit", get(account::edit_page).post(account::edit))
        .route(
            "/password",
            get(account::password_page).post(account::change_password),
        )
        .route(
            "/addresses",
            get(addresses::index).post(addresses::create),
        )
        .route("/addresses/new", get(addresses::new_page))
        .route("/addresses/{id}", post(addresses::update))
        .route("/addresses/{id}/edit", get(addresses::edit_page))
        .route("/addresses/{id}/delete", post(addresses::delete))
        .route("/addresses/{id}/default", post(addresses::set_default))
}

/// Create the quote routes router.
pub fn devis_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(devis::index))
        .route("/new", get(devis::new_page).post(devis::create))
        .route("/{id}", get(devis::show))
        .route("/{id}/pdf", get(devis::document))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/products", product_routes())
        .route("/promotions", get(products::promotions))
        .nest("/search", search_routes())
        .nest("/cart", cart_routes())
        .nest("/favorites", favorite_routes())
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .nest("/devis", devis_routes())
        .route("/pro", get(pro::page).post(pro::apply))
}
