//! Professional account requests.

use reqwest::Method;
use secrecy::SecretString;
use tracing::instrument;

use comptoir_core::UserId;

use super::types::{Postulation, PostulationRequest};
use super::{ApiError, BackendClient};

impl BackendClient {
    /// Submit a request for professional pricing.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Conflict` when a request is already pending.
    #[instrument(skip(self, token, request), fields(user_id = %request.user_id))]
    pub async fn create_postulation(
        &self,
        token: &SecretString,
        request: &PostulationRequest,
    ) -> Result<Postulation, ApiError> {
        let path = "/postulations";
        let builder = self.request(Method::POST, path, Some(token))?.json(request);
        self.send_json(builder, path).await
    }

    /// The customer's latest request, `None` if they never applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails for another reason than 404.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn get_postulation(
        &self,
        token: &SecretString,
        user_id: UserId,
    ) -> Result<Option<Postulation>, ApiError> {
        let path = format!("/postulations/users/{user_id}");
        let builder = self.request(Method::GET, &path, Some(token))?;
        match self.send_json(builder, &path).await {
            Ok(postulation) => Ok(Some(postulation)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
