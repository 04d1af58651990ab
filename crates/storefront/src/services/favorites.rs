//! Cached favorites with optimistic updates.
//!
//! The session keeps the pages loaded so far. A toggle mutates the cached list
//! first, then calls the backend; on failure the exact previous state is put
//! back.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use comptoir_core::{FavoriteId, ProductId};

use crate::backend::{ApiError, BackendClient, Favorite, Page, ProductSummary};
use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};

/// Favorites fetched per page.
pub const PAGE_SIZE: u32 = 12;

/// Id given to an entry until the backend confirms it.
const PENDING_ID: FavoriteId = FavoriteId::new(0);

/// What a toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
}

/// Favorites loaded so far plus pagination state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoritesState {
    items: Vec<Favorite>,
    next_page: u32,
    total: u64,
    has_more: bool,
    loaded: bool,
}

impl FavoritesState {
    #[must_use]
    pub fn items(&self) -> &[Favorite] {
        &self.items
    }

    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.has_more
    }

    #[must_use]
    pub const fn next_page(&self) -> u32 {
        self.next_page
    }

    /// Number of favorites, including pages not loaded yet.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.total.max(self.items.len() as u64)
    }

    #[must_use]
    pub fn is_favorite(&self, product_id: ProductId) -> bool {
        self.items.iter().any(|f| f.product_id == product_id)
    }

    /// Append a page, skipping products already present.
    pub fn apply_page(&mut self, page: Page<Favorite>) {
        let has_next = page.has_next();
        for favorite in page.content {
            if !self.is_favorite(favorite.product_id) {
                self.items.push(favorite);
            }
        }
        self.next_page = page.page.saturating_add(1);
        self.total = page.total_elements;
        self.has_more = has_next;
        self.loaded = true;
    }

    /// Insert a pending entry at the front.
    pub fn optimistic_add(&mut self, product: ProductSummary) {
        if self.is_favorite(product.id) {
            return;
        }
        self.items.insert(
            0,
            Favorite {
                id: PENDING_ID,
                product_id: product.id,
                product: Some(product),
                created_at: None,
            },
        );
        self.total += 1;
    }

    /// Replace the pending entry with the backend's copy.
    pub fn confirm_add(&mut self, mut favorite: Favorite) {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|f| f.product_id == favorite.product_id)
        {
            if favorite.product.is_none() {
                favorite.product = existing.product.take();
            }
            *existing = favorite;
        }
    }

    /// Returns `false` if the product was not cached as a favorite.
    pub fn optimistic_remove(&mut self, product_id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|f| f.product_id != product_id);
        let removed = self.items.len() != before;
        if removed {
            self.total = self.total.saturating_sub(1);
        }
        removed
    }
}

/// Read the cached favorites from the session.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load(session: &Session) -> Result<FavoritesState, tower_sessions::session::Error> {
    Ok(session.get(session_keys::FAVORITES).await?.unwrap_or_default())
}

/// # Errors
///
/// Returns an error if the session store fails.
pub async fn store(
    session: &Session,
    state: &FavoritesState,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::FAVORITES, state).await
}

/// Drop the cached favorites (login, logout).
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn reset(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<FavoritesState>(session_keys::FAVORITES)
        .await?;
    Ok(())
}

/// Cached favorites, fetching the first page if nothing is loaded yet.
///
/// # Errors
///
/// Returns an error if the backend or the session store fails.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn ensure_loaded(
    session: &Session,
    backend: &BackendClient,
    user: &CurrentUser,
) -> Result<FavoritesState, AppError> {
    let mut state = load(session).await?;
    if !state.is_loaded() {
        let page = backend
            .list_favorites(&user.access_token, 0, PAGE_SIZE)
            .await?;
        state.apply_page(page);
        store(session, &state).await?;
    }
    Ok(state)
}

/// Fetch and append the next page.
///
/// # Errors
///
/// Returns an error if the backend or the session store fails.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn load_more(
    session: &Session,
    backend: &BackendClient,
    user: &CurrentUser,
) -> Result<FavoritesState, AppError> {
    let mut state = ensure_loaded(session, backend, user).await?;
    if state.has_more() {
        let page = backend
            .list_favorites(&user.access_token, state.next_page(), PAGE_SIZE)
            .await?;
        state.apply_page(page);
        store(session, &state).await?;
    }
    Ok(state)
}

/// Add or remove a favorite.
///
/// The cached list is updated before the backend call and restored to its
/// previous state if the call fails. A 409 on add or a 404 on remove means the
/// backend already agrees and counts as success.
///
/// # Errors
///
/// Returns the backend error after rolling back, or a session error.
#[instrument(skip_all, fields(user_id = %user.id, product_id = %product.id))]
pub async fn toggle(
    session: &Session,
    backend: &BackendClient,
    user: &CurrentUser,
    product: ProductSummary,
) -> Result<(Toggle, FavoritesState), AppError> {
    let mut state = ensure_loaded(session, backend, user).await?;
    let snapshot = state.clone();
    let product_id = product.id;

    let outcome = if state.is_favorite(product_id) {
        state.optimistic_remove(product_id);
        match backend.remove_favorite(&user.access_token, product_id).await {
            Ok(()) | Err(ApiError::NotFound(_)) => Ok(Toggle::Removed),
            Err(e) => Err(e),
        }
    } else {
        state.optimistic_add(product);
        match backend.add_favorite(&user.access_token, product_id).await {
            Ok(favorite) => {
                state.confirm_add(favorite);
                Ok(Toggle::Added)
            }
            Err(ApiError::Conflict(_)) => {
                // Already a favorite on a page not loaded yet: the total
                // counted it.
                state.total = snapshot.total;
                Ok(Toggle::Added)
            }
            Err(e) => Err(e),
        }
    };

    match outcome {
        Ok(toggle) => {
            store(session, &state).await?;
            Ok((toggle, state))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Favorite toggle failed, rolling back");
            store(session, &snapshot).await?;
            Err(e.into())
        }
    }
}
