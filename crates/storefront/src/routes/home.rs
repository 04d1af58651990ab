//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::{Category, ProductQuery, ProductSort};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::routes::FavoriteIds;
use crate::state::AppState;
use crate::views::{Nav, ProductCard};

/// Products shown in each home section.
const SECTION_SIZE: usize = 8;
const LATEST_PAGE_SIZE: u32 = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub nav: Nav,
    pub promotions: Vec<ProductCard>,
    pub latest: Vec<ProductCard>,
    pub categories: Vec<Category>,
}

/// Display the home page.
///
/// Every section is optional: a failing backend call leaves it empty rather
/// than failing the page.
#[instrument(skip(state, session, user))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> impl IntoResponse {
    let latest_query = ProductQuery {
        size: LATEST_PAGE_SIZE,
        sort: ProductSort::Newest,
        ..ProductQuery::default()
    };

    let backend = state.backend();
    let (promotions, latest, categories) = tokio::join!(
        backend.list_promotions(),
        backend.list_products(&latest_query),
        backend.list_categories()
    );

    let favorites = FavoriteIds::load(&session, backend, user.as_ref()).await;
    let card = |p: &crate::backend::Product| ProductCard::from_product(p, favorites.contains(p.id));

    let promotions = promotions.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load promotions");
        Vec::new()
    });
    let latest = latest.map(|page| page.content).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load latest products");
        Vec::new()
    });
    let categories = categories.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load categories");
        Vec::new()
    });

    HomeTemplate {
        nav: Nav::new(user.as_ref()),
        promotions: promotions
            .iter()
            .filter(|p| p.is_on_promotion())
            .take(SECTION_SIZE)
            .map(card)
            .collect(),
        latest: latest.iter().take(SECTION_SIZE).map(card).collect(),
        categories,
    }
}
