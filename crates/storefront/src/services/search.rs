//! Search queries and history.
//!
//! Logged-in customers keep their history on the backend (`/search-history`).
//! Guests get the last [`GUEST_HISTORY_LIMIT`] queries in the session.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use comptoir_core::SearchHistoryId;

use crate::backend::{BackendClient, SearchHistoryEntry};
use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};

/// Shortest query that triggers suggestions.
pub const MIN_SUGGEST_LENGTH: usize = 2;

/// Suggestions shown in the dropdown.
pub const SUGGESTION_LIMIT: u32 = 6;

/// Guest history length.
pub const GUEST_HISTORY_LIMIT: usize = 10;

/// Longest query accepted, in characters.
pub const MAX_QUERY_LENGTH: usize = 100;

/// Trim, collapse inner whitespace and cap the length.
#[must_use]
pub fn normalize_query(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_QUERY_LENGTH)
        .collect()
}

/// Whether a query is long enough for suggestions.
#[must_use]
pub fn wants_suggestions(query: &str) -> bool {
    query.chars().count() >= MIN_SUGGEST_LENGTH
}

/// One history row, whether it came from the backend or the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryItem {
    /// Backend id; `None` for guest entries.
    pub id: Option<SearchHistoryId>,
    pub query: String,
}

impl From<SearchHistoryEntry> for HistoryItem {
    fn from(entry: SearchHistoryEntry) -> Self {
        Self {
            id: Some(entry.id),
            query: entry.query,
        }
    }
}

/// Per-visitor search state kept in the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchState {
    last_saved: Option<String>,
    /// Guest history, most recent first.
    recent: Vec<String>,
}

impl SearchState {
    /// Whether `query` should be recorded: non-empty and not the same
    /// (ignoring case) as the last recorded query.
    #[must_use]
    pub fn should_save(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }
        self.last_saved
            .as_deref()
            .is_none_or(|last| last.to_lowercase() != query.to_lowercase())
    }

    pub fn mark_saved(&mut self, query: &str) {
        self.last_saved = Some(query.trim().to_string());
    }

    /// Push to the guest history, moving a repeated query to the front.
    pub fn remember(&mut self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        let lowered = query.to_lowercase();
        self.recent.retain(|q| q.to_lowercase() != lowered);
        self.recent.insert(0, query.to_string());
        self.recent.truncate(GUEST_HISTORY_LIMIT);
    }

    #[must_use]
    pub fn recent(&self) -> &[String] {
        &self.recent
    }

    /// Returns `false` if the query was not in the guest history.
    pub fn forget(&mut self, query: &str) -> bool {
        let before = self.recent.len();
        self.recent.retain(|q| q != query);
        self.recent.len() != before
    }

    pub fn clear_recent(&mut self) {
        self.recent.clear();
        self.last_saved = None;
    }
}

/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load(session: &Session) -> Result<SearchState, tower_sessions::session::Error> {
    Ok(session.get(session_keys::SEARCH).await?.unwrap_or_default())
}

/// # Errors
///
/// Returns an error if the session store fails.
pub async fn store(
    session: &Session,
    state: &SearchState,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::SEARCH, state).await
}

/// Drop the search state (login, logout).
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn reset(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<SearchState>(session_keys::SEARCH).await?;
    Ok(())
}

/// Record a submitted query. Backend failures are logged; searching still
/// works without history.
///
/// Returns whether the query was recorded.
///
/// # Errors
///
/// Returns an error if the session store fails.
#[instrument(skip(session, backend, user))]
pub async fn record(
    session: &Session,
    backend: &BackendClient,
    user: Option<&CurrentUser>,
    query: &str,
) -> Result<bool, tower_sessions::session::Error> {
    let mut state = load(session).await?;
    if !state.should_save(query) {
        return Ok(false);
    }

    match user {
        Some(user) => {
            if let Err(e) = backend.save_search(&user.access_token, query.trim()).await {
                tracing::warn!(error = %e, "Failed to save search history");
                return Ok(false);
            }
        }
        None => state.remember(query),
    }

    state.mark_saved(query);
    store(session, &state).await?;
    Ok(true)
}

/// The visitor's history, most recent first.
///
/// # Errors
///
/// Returns an error if the backend or the session store fails.
#[instrument(skip_all)]
pub async fn history(
    session: &Session,
    backend: &BackendClient,
    user: Option<&CurrentUser>,
) -> Result<Vec<HistoryItem>, AppError> {
    if let Some(user) = user {
        let entries = backend.list_search_history(&user.access_token).await?;
        return Ok(entries.into_iter().map(HistoryItem::from).collect());
    }

    let state = load(session).await?;
    Ok(state
        .recent()
        .iter()
        .map(|query| HistoryItem {
            id: None,
            query: query.clone(),
        })
        .collect())
}

/// Delete one entry: by id for customers, by query text for guests.
///
/// # Errors
///
/// Returns an error if the backend or the session store fails.
#[instrument(skip(session, backend, user))]
pub async fn delete(
    session: &Session,
    backend: &BackendClient,
    user: Option<&CurrentUser>,
    id: Option<SearchHistoryId>,
    query: Option<&str>,
) -> Result<(), AppError> {
    let mut state = load(session).await?;
    match (user, id) {
        (Some(user), Some(id)) => backend.delete_search(&user.access_token, id).await?,
        _ => {
            if let Some(query) = query {
                state.forget(query);
            }
        }
    }
    // A deleted query may be searched again right away.
    state.last_saved = None;
    store(session, &state).await?;
    Ok(())
}

/// Clear the whole history.
///
/// # Errors
///
/// Returns an error if the backend or the session store fails.
#[instrument(skip_all)]
pub async fn clear(
    session: &Session,
    backend: &BackendClient,
    user: Option<&CurrentUser>,
) -> Result<(), AppError> {
    if let Some(user) = user {
        backend.clear_search_history(&user.access_token).await?;
    }
    let mut state = load(session).await?;
    state.clear_recent();
    store(session, &state).await?;
    Ok(())
}
