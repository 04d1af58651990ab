//! Address book endpoints.

use reqwest::Method;
use secrecy::SecretString;
use tracing::instrument;

use comptoir_core::{AddressId, UserId};

use super::types::{Address, AddressInput};
use super::{ApiError, BackendClient};

impl BackendClient {
    /// All addresses of a customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn list_addresses(
        &self,
        token: &SecretString,
        user_id: UserId,
    ) -> Result<Vec<Address>, ApiError> {
        let path = format!("/addresses/users/{user_id}");
        let builder = self.request(Method::GET, &path, Some(token))?;
        self.send_json(builder, &path).await
    }

    /// Add an address to a customer's book.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` when the backend rejects a field.
    #[instrument(skip(self, token, input), fields(user_id = %user_id))]
    pub async fn create_address(
        &self,
        token: &SecretString,
        user_id: UserId,
        input: &AddressInput,
    ) -> Result<Address, ApiError> {
        let path = format!("/addresses/users/{user_id}");
        let builder = self.request(Method::POST, &path, Some(token))?.json(input);
        self.send_json(builder, &path).await
    }

    /// Replace an address.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self, token, input), fields(address_id = %id))]
    pub async fn update_address(
        &self,
        token: &SecretString,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<Address, ApiError> {
        let path = format!("/addresses/{id}");
        let builder = self.request(Method::PUT, &path, Some(token))?.json(input);
        self.send_json(builder, &path).await
    }

    /// Delete an address.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self, token), fields(address_id = %id))]
    pub async fn delete_address(&self, token: &SecretString, id: AddressId) -> Result<(), ApiError> {
        let path = format!("/addresses/{id}");
        let builder = self.request(Method::DELETE, &path, Some(token))?;
        self.send_empty(builder, &path).await
    }

    /// Make an address the default one. The backend unsets the previous default.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self, token), fields(address_id = %id))]
    pub async fn set_default_address(
        &self,
        token: &SecretString,
        id: AddressId,
    ) -> Result<Address, ApiError> {
        let path = format!("/addresses/{id}/default");
        let builder = self.request(Method::PATCH, &path, Some(token))?;
        self.send_json(builder, &path).await
    }
}
