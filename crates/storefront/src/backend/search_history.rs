//! Saved search endpoints.

use reqwest::Method;
use secrecy::SecretString;
use serde_json::json;
use tracing::instrument;

use comptoir_core::SearchHistoryId;

use super::types::SearchHistoryEntry;
use super::{ApiError, BackendClient};

impl BackendClient {
    /// The customer's saved searches, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all)]
    pub async fn list_search_history(
        &self,
        token: &SecretString,
    ) -> Result<Vec<SearchHistoryEntry>, ApiError> {
        let path = "/search-history";
        let builder = self.request(Method::GET, path, Some(token))?;
        self.send_json(builder, path).await
    }

    /// Save a search query.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, token))]
    pub async fn save_search(
        &self,
        token: &SecretString,
        query: &str,
    ) -> Result<SearchHistoryEntry, ApiError> {
        let path = "/search-history";
        let builder = self
            .request(Method::POST, path, Some(token))?
            .json(&json!({ "query": query }));
        self.send_json(builder, path).await
    }

    /// Delete one saved search.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self, token), fields(entry_id = %id))]
    pub async fn delete_search(&self, token: &SecretString, id: SearchHistoryId) -> Result<(), ApiError> {
        let path = format!("/search-history/{id}");
        let builder = self.request(Method::DELETE, &path, Some(token))?;
        self.send_empty(builder, &path).await
    }

    /// Delete every saved search.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip_all)]
    pub async fn clear_search_history(&self, token: &SecretString) -> Result<(), ApiError> {
        let path = "/search-history";
        let builder = self.request(Method::DELETE, path, Some(token))?;
        self.send_empty(builder, path).await
    }
}
