//! Favorites endpoints.

use reqwest::Method;
use secrecy::SecretString;
use serde_json::json;
use tracing::instrument;

use comptoir_core::ProductId;

use super::types::{Favorite, Page};
use super::{ApiError, BackendClient};

impl BackendClient {
    /// One page of the customer's favorites, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, token))]
    pub async fn list_favorites(
        &self,
        token: &SecretString,
        page: u32,
        size: u32,
    ) -> Result<Page<Favorite>, ApiError> {
        let path = "/favorites";
        let builder = self
            .request(Method::GET, path, Some(token))?
            .query(&[("page", page), ("size", size)]);
        self.send_json(builder, path).await
    }

    /// Bookmark a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Conflict` if the product is already a favorite.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn add_favorite(
        &self,
        token: &SecretString,
        product_id: ProductId,
    ) -> Result<Favorite, ApiError> {
        let path = "/favorites";
        let builder = self
            .request(Method::POST, path, Some(token))?
            .json(&json!({ "productId": product_id }));
        self.send_json(builder, path).await
    }

    /// Remove a product from the favorites.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product was not a favorite.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn remove_favorite(
        &self,
        token: &SecretString,
        product_id: ProductId,
    ) -> Result<(), ApiError> {
        let path = format!("/favorites/{product_id}");
        let builder = self.request(Method::DELETE, &path, Some(token))?;
        self.send_empty(builder, &path).await
    }
}
