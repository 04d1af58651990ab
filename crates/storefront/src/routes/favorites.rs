//! Favorites route handlers.
//!
//! Heart buttons post to `/favorites/toggle` and swap themselves with the
//! returned fragment; the header badge listens for `favorites-updated`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use comptoir_core::ProductId;

use crate::backend::Favorite;
use crate::error::Result;
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::routes::is_htmx;
use crate::services::favorites::{self, FavoritesState, Toggle};
use crate::state::AppState;
use crate::views::{Nav, ProductCard};

/// Toggle form data.
#[derive(Debug, Deserialize)]
pub struct ToggleForm {
    pub product_id: ProductId,
}

/// Favorites page template.
#[derive(Template, WebTemplate)]
#[template(path = "favorites/index.html")]
pub struct FavoritesTemplate {
    pub nav: Nav,
    pub products: Vec<ProductCard>,
    pub count: u64,
    pub has_more: bool,
}

/// Next page fragment, with a new "load more" button when needed.
#[derive(Template, WebTemplate)]
#[template(path = "partials/favorites_page.html")]
pub struct FavoritesPageTemplate {
    pub products: Vec<ProductCard>,
    pub has_more: bool,
}

/// Heart button fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/favorite_button.html")]
pub struct FavoriteButtonTemplate {
    pub product_id: i64,
    pub is_favorite: bool,
}

/// Favorites badge fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/favorites_count.html")]
pub struct FavoritesCountTemplate {
    pub count: u64,
}

fn cards(items: &[Favorite]) -> Vec<ProductCard> {
    items
        .iter()
        .filter_map(|f| f.product.as_ref())
        .map(|p| ProductCard::from_summary(p, true))
        .collect()
}

/// Display the favorites page.
#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let favorites = favorites::ensure_loaded(&session, state.backend(), &user).await?;
    Ok(FavoritesTemplate {
        nav: Nav::new(Some(&user)),
        products: cards(favorites.items()),
        count: favorites.count(),
        has_more: favorites.has_more(),
    })
}

/// Load the next page (HTMX). Only the newly appended favorites are returned.
#[instrument(skip(state, session, user))]
pub async fn more(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let before = favorites::load(&session).await?.items().len();
    let favorites = favorites::load_more(&session, state.backend(), &user).await?;
    let appended = favorites.items().get(before..).unwrap_or_default();

    Ok(FavoritesPageTemplate {
        products: cards(appended),
        has_more: favorites.has_more(),
    })
}

/// Add or remove a favorite.
///
/// On failure the cached favorites are left exactly as before and the error
/// page is returned; htmx does not swap error responses, so the heart keeps
/// its previous state.
#[instrument(skip(state, session, user, headers))]
pub async fn toggle(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    headers: HeaderMap,
    Form(form): Form<ToggleForm>,
) -> Result<Response> {
    let product = state.backend().get_product(form.product_id).await?;
    let (outcome, _) =
        favorites::toggle(&session, state.backend(), &user, product.summary()).await?;

    if is_htmx(&headers) {
        Ok((
            AppendHeaders([("HX-Trigger", "favorites-updated")]),
            FavoriteButtonTemplate {
                product_id: form.product_id.as_i64(),
                is_favorite: outcome == Toggle::Added,
            },
        )
            .into_response())
    } else {
        Ok(Redirect::to("/favorites").into_response())
    }
}

/// Favorites badge (HTMX). Guests see nothing.
#[instrument(skip(state, session, user))]
pub async fn count(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> impl IntoResponse {
    let count = match user {
        Some(user) => favorites::ensure_loaded(&session, state.backend(), &user)
            .await
            .as_ref()
            .map_or(0, FavoritesState::count),
        None => 0,
    };
    FavoritesCountTemplate { count }
}
