//! Quote (devis) endpoints.

use reqwest::Method;
use secrecy::SecretString;
use tracing::instrument;

use comptoir_core::{QuoteId, UserId};

use super::types::{Quote, QuoteRequest, Representative};
use super::{ApiError, BackendClient};

/// A downloadable quote document.
#[derive(Debug, Clone)]
pub struct QuoteDocument {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl BackendClient {
    /// Submit a quote request.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` when an item is unknown or unavailable.
    #[instrument(skip(self, token, request), fields(client_id = %request.client_id, items = request.items.len()))]
    pub async fn create_quote(
        &self,
        token: &SecretString,
        request: &QuoteRequest,
    ) -> Result<Quote, ApiError> {
        let path = "/devis";
        let builder = self.request(Method::POST, path, Some(token))?.json(request);
        self.send_json(builder, path).await
    }

    /// All quotes of a client, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, token), fields(client_id = %client_id))]
    pub async fn list_quotes(
        &self,
        token: &SecretString,
        client_id: UserId,
    ) -> Result<Vec<Quote>, ApiError> {
        let path = format!("/devis/by-client/{client_id}");
        let builder = self.request(Method::GET, &path, Some(token))?;
        self.send_json(builder, &path).await
    }

    /// A single quote.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` when the quote belongs to someone else.
    #[instrument(skip(self, token), fields(quote_id = %id))]
    pub async fn get_quote(&self, token: &SecretString, id: QuoteId) -> Result<Quote, ApiError> {
        let path = format!("/devis/{id}");
        let builder = self.request(Method::GET, &path, Some(token))?;
        self.send_json(builder, &path).await
    }

    /// The generated quote document (PDF).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` while the document has not been generated.
    #[instrument(skip(self, token), fields(quote_id = %id))]
    pub async fn quote_document(
        &self,
        token: &SecretString,
        id: QuoteId,
    ) -> Result<QuoteDocument, ApiError> {
        let path = format!("/devis/{id}/pdf");
        let builder = self.request(Method::GET, &path, Some(token))?;
        let (bytes, content_type) = self.send_bytes(builder, &path).await?;
        Ok(QuoteDocument {
            bytes,
            content_type: content_type.unwrap_or_else(|| "application/pdf".to_string()),
        })
    }

    /// Sales representatives a quote can be addressed to.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, token))]
    pub async fn list_representatives(
        &self,
        token: &SecretString,
    ) -> Result<Vec<Representative>, ApiError> {
        let path = "/representatives";
        let builder = self.request(Method::GET, path, Some(token))?;
        self.send_json(builder, path).await
    }
}
