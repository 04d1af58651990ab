//! Server-side cart persistence for logged-in customers.

use reqwest::Method;
use secrecy::SecretString;
use tracing::instrument;

use comptoir_core::UserId;

use super::types::ServerCart;
use super::{ApiError, BackendClient};

impl BackendClient {
    /// The cart saved for a customer. A customer who never saved one gets an
    /// empty cart rather than an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails for another reason than 404.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn get_cart(&self, token: &SecretString, user_id: UserId) -> Result<ServerCart, ApiError> {
        let path = format!("/carts/users/{user_id}");
        let builder = self.request(Method::GET, &path, Some(token))?;
        match self.send_json(builder, &path).await {
            Err(ApiError::NotFound(_)) => Ok(ServerCart::default()),
            other => other,
        }
    }

    /// Replace the saved cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, token, cart), fields(user_id = %user_id, items = cart.items.len()))]
    pub async fn save_cart(
        &self,
        token: &SecretString,
        user_id: UserId,
        cart: &ServerCart,
    ) -> Result<ServerCart, ApiError> {
        let path = format!("/carts/users/{user_id}");
        let builder = self.request(Method::PUT, &path, Some(token))?.json(cart);
        self.send_json(builder, &path).await
    }
}
