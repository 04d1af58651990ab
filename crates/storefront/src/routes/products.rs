//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use comptoir_core::{CategoryId, ProductId};

use crate::backend::{Category, DEFAULT_PAGE_SIZE, Product, ProductQuery, ProductSort};
use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::routes::FavoriteIds;
use crate::state::AppState;
use crate::views::{Nav, Pager, ProductCard};

/// Product detail display data.
#[derive(Clone)]
pub struct ProductDetailView {
    pub card: ProductCard,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub unit: Option<String>,
    pub category: Option<Category>,
    pub stock: u32,
}

impl ProductDetailView {
    fn new(product: &Product, is_favorite: bool) -> Self {
        Self {
            card: ProductCard::from_product(product, is_favorite),
            description: product.description.clone(),
            brand: product.brand.clone(),
            unit: product.unit.clone(),
            category: product.category.clone(),
            stock: product.stock,
        }
    }
}

/// A sort choice in the listing dropdown.
#[derive(Clone)]
pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn sort_options(current: ProductSort) -> Vec<SortOption> {
    [
        (ProductSort::Relevance, "Pertinence"),
        (ProductSort::PriceAsc, "Prix croissant"),
        (ProductSort::PriceDesc, "Prix décroissant"),
        (ProductSort::Newest, "Nouveautés"),
        (ProductSort::Name, "Nom"),
    ]
    .into_iter()
    .map(|(sort, label)| SortOption {
        value: sort.as_str(),
        label,
        selected: sort == current,
    })
    .collect()
}

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub page: Option<u32>,
    pub category: Option<CategoryId>,
    pub sort: Option<String>,
}

impl ListingQuery {
    fn to_product_query(&self) -> ProductQuery {
        ProductQuery {
            page: self.page.unwrap_or(0),
            size: DEFAULT_PAGE_SIZE,
            category: self.category,
            sort: self.sort.as_deref().map(ProductSort::parse).unwrap_or_default(),
        }
    }
}

/// Listing URL for another page, keeping category and sort.
fn listing_url(query: &ProductQuery, page: u32) -> String {
    let mut url = format!("/products?page={page}");
    if let Some(category) = query.category {
        url.push_str(&format!("&category={category}"));
    }
    if query.sort != ProductSort::default() {
        url.push_str("&sort=");
        url.push_str(query.sort.as_str());
    }
    url
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub nav: Nav,
    pub products: Vec<ProductCard>,
    pub categories: Vec<Category>,
    pub current_category: Option<i64>,
    pub sort_options: Vec<SortOption>,
    pub total: u64,
    pub pager: Pager,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub nav: Nav,
    pub product: ProductDetailView,
    pub is_logged_in: bool,
}

/// Promotions page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/promotions.html")]
pub struct PromotionsTemplate {
    pub nav: Nav,
    pub products: Vec<ProductCard>,
}

impl ProductsIndexTemplate {
    /// Whether the listing is filtered on `category`.
    fn is_current(&self, category: &Category) -> bool {
        self.current_category == Some(category.id.as_i64())
    }
}

/// Display product listing page.
#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<ListingQuery>,
) -> Result<impl IntoResponse> {
    let product_query = query.to_product_query();
    let (page, categories) = tokio::join!(
        state.backend().list_products(&product_query),
        state.backend().list_categories()
    );
    let page = page?;
    let categories = categories.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load categories");
        Vec::new()
    });

    let favorites = FavoriteIds::load(&session, state.backend(), user.as_ref()).await;

    Ok(ProductsIndexTemplate {
        nav: Nav::new(user.as_ref()),
        products: page
            .content
            .iter()
            .map(|p| ProductCard::from_product(p, favorites.contains(p.id)))
            .collect(),
        categories,
        current_category: product_query.category.map(|c| c.as_i64()),
        sort_options: sort_options(product_query.sort),
        total: page.total_elements,
        pager: Pager::new(&page, |p| listing_url(&product_query, p)),
    })
}

/// Display product detail page.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    let product = state.backend().get_product(id).await?;
    let favorites = FavoriteIds::load(&session, state.backend(), user.as_ref()).await;

    Ok(ProductShowTemplate {
        nav: Nav::new(user.as_ref()),
        product: ProductDetailView::new(&product, favorites.contains(product.id)),
        is_logged_in: user.is_some(),
    })
}

/// Display products currently on promotion.
#[instrument(skip(state, session, user))]
pub async fn promotions(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse> {
    let products = state.backend().list_promotions().await?;
    let favorites = FavoriteIds::load(&session, state.backend(), user.as_ref()).await;

    Ok(PromotionsTemplate {
        nav: Nav::new(user.as_ref()),
        products: products
            .iter()
            .filter(|p| p.is_on_promotion())
            .map(|p| ProductCard::from_product(p, favorites.contains(p.id)))
            .collect(),
    })
}
