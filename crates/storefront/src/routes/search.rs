//! Search route handlers.
//!
//! The header search box asks `/search/suggest` as the visitor types (htmx
//! `keyup changed delay:300ms`). Submitting goes to `/search`, which records
//! the query in the visitor's history.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use comptoir_core::SearchHistoryId;

use crate::backend::{DEFAULT_PAGE_SIZE, Product};
use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::routes::{FavoriteIds, is_htmx};
use crate::services::search::{
    self, HistoryItem, SUGGESTION_LIMIT, normalize_query, wants_suggestions,
};
use crate::state::AppState;
use crate::views::{Nav, Pager, ProductCard};

/// Search query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<u32>,
}

/// Suggestion display data.
#[derive(Clone)]
pub struct SuggestionView {
    pub id: i64,
    pub name: String,
    pub reference: String,
    pub price: String,
    pub image_url: Option<String>,
}

impl From<&Product> for SuggestionView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i64(),
            name: product.name.clone(),
            reference: product.reference.clone(),
            price: product.effective_price().display(),
            image_url: product.image_url.clone(),
        }
    }
}

/// History row display data.
#[derive(Clone)]
pub struct HistoryView {
    /// Backend id, or `None` for guest entries.
    pub id: Option<i64>,
    pub query: String,
    pub search_url: String,
}

impl From<HistoryItem> for HistoryView {
    fn from(item: HistoryItem) -> Self {
        Self {
            id: item.id.map(|id| id.as_i64()),
            search_url: format!("/search?q={}", urlencoding::encode(&item.query)),
            query: item.query,
        }
    }
}

/// Search results page template.
#[derive(Template, WebTemplate)]
#[template(path = "search/results.html")]
pub struct SearchResultsTemplate {
    pub nav: Nav,
    pub query: String,
    pub products: Vec<ProductCard>,
    pub total: u64,
    pub pager: Pager,
    pub history: Vec<HistoryView>,
}

/// Suggestions dropdown fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/search_suggestions.html")]
pub struct SuggestionsTemplate {
    pub query: String,
    pub suggestions: Vec<SuggestionView>,
}

/// History list fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/search_history.html")]
pub struct HistoryTemplate {
    pub history: Vec<HistoryView>,
}

/// Display search results and record the query.
#[instrument(skip(state, session, user))]
pub async fn results(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<SearchQuery>,
) -> Result<Response> {
    let q = normalize_query(&query.q);
    let backend = state.backend();

    if q.is_empty() {
        let history = load_history(&session, &state, user.as_ref()).await;
        return Ok(SearchResultsTemplate {
            nav: Nav::new(user.as_ref()),
            query: q,
            products: Vec::new(),
            total: 0,
            pager: Pager::default(),
            history,
        }
        .into_response());
    }

    let page = backend
        .search_products(&q, query.page.unwrap_or(0), DEFAULT_PAGE_SIZE)
        .await?;

    // Only the first page counts as a new search
    if query.page.unwrap_or(0) == 0 {
        search::record(&session, backend, user.as_ref(), &q).await?;
    }

    let favorites = FavoriteIds::load(&session, backend, user.as_ref()).await;
    let encoded = urlencoding::encode(&q).into_owned();

    Ok(SearchResultsTemplate {
        nav: Nav::new(user.as_ref()).with_query(&q),
        products: page
            .content
            .iter()
            .map(|p| ProductCard::from_product(p, favorites.contains(p.id)))
            .collect(),
        total: page.total_elements,
        pager: Pager::new(&page, |p| format!("/search?q={encoded}&page={p}")),
        query: q,
        history: Vec::new(),
    }
    .into_response())
}

/// Suggestions fragment (HTMX). Short queries get an empty fragment.
#[instrument(skip(state))]
pub async fn suggest(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let q = normalize_query(&query.q);
    let suggestions = if wants_suggestions(&q) {
        state
            .backend()
            .search_products(&q, 0, SUGGESTION_LIMIT)
            .await
            .map(|page| page.content.iter().map(SuggestionView::from).collect())
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Suggestion lookup failed");
                Vec::new()
            })
    } else {
        Vec::new()
    };

    SuggestionsTemplate {
        query: q,
        suggestions,
    }
}

async fn load_history(
    session: &Session,
    state: &AppState,
    user: Option<&crate::models::CurrentUser>,
) -> Vec<HistoryView> {
    match search::history(session, state.backend(), user).await {
        Ok(items) => items.into_iter().map(HistoryView::from).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load search history");
            Vec::new()
        }
    }
}

/// History fragment (HTMX).
#[instrument(skip(state, session, user))]
pub async fn history(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> impl IntoResponse {
    HistoryTemplate {
        history: load_history(&session, &state, user.as_ref()).await,
    }
}

/// Guest entries have no id; the form carries the query text instead.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteHistoryForm {
    pub query: Option<String>,
}

/// Answer a history mutation: refreshed fragment for HTMX, redirect otherwise.
async fn history_response(
    headers: &HeaderMap,
    session: &Session,
    state: &AppState,
    user: Option<&crate::models::CurrentUser>,
) -> Response {
    if is_htmx(headers) {
        HistoryTemplate {
            history: load_history(session, state, user).await,
        }
        .into_response()
    } else {
        Redirect::to("/search").into_response()
    }
}

/// Delete one history entry. Guest entries use id `0`.
#[instrument(skip(state, session, user, headers))]
pub async fn delete_history(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<DeleteHistoryForm>,
) -> Result<Response> {
    let id = (id > 0).then(|| SearchHistoryId::new(id));
    search::delete(
        &session,
        state.backend(),
        user.as_ref(),
        id,
        form.query.as_deref(),
    )
    .await?;
    Ok(history_response(&headers, &session, &state, user.as_ref()).await)
}

/// Clear the history.
#[instrument(skip(state, session, user, headers))]
pub async fn clear_history(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    headers: HeaderMap,
) -> Result<Response> {
    search::clear(&session, state.backend(), user.as_ref()).await?;
    Ok(history_response(&headers, &session, &state, user.as_ref()).await)
}
