//! Shared request plumbing for the backend client.

use std::sync::Arc;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::ApiError;
use super::cache::{CacheKey, CacheValue};
use crate::config::BackendConfig;

/// Header carrying the storefront's client key.
const API_KEY_HEADER: &str = "X-Api-Key";

/// Client for the Comptoir REST backend.
///
/// Cheap to clone; all clones share the HTTP connection pool and the catalog
/// cache.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("comptoir-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        // A trailing slash makes `Url::join` append instead of replacing the
        // last segment (`/api` + `products` would otherwise give `/products`).
        let mut base_url = config.api_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url,
                api_key: config.api_key.clone(),
                cache,
            }),
        })
    }

    /// Resolve an endpoint path (`/favorites`) against the base URL.
    pub(super) fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Start a request, attaching the client key and the visitor's token.
    pub(super) fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&SecretString>,
    ) -> Result<RequestBuilder, ApiError> {
        let mut builder = self.inner.client.request(method, self.url(path)?);
        if let Some(key) = &self.inner.api_key {
            builder = builder.header(API_KEY_HEADER, key.expose_secret());
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token.expose_secret());
        }
        Ok(builder)
    }

    /// Send a request and decode the JSON body.
    pub(super) async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = Self::check(builder.send().await?, path).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                path,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to decode backend response"
            );
            ApiError::Parse(e)
        })
    }

    /// Send a request whose response body is irrelevant.
    pub(super) async fn send_empty(&self, builder: RequestBuilder, path: &str) -> Result<(), ApiError> {
        Self::check(builder.send().await?, path).await?;
        Ok(())
    }

    /// Send a request and return the raw body with its content type.
    pub(super) async fn send_bytes(
        &self,
        builder: RequestBuilder,
        path: &str,
    ) -> Result<(Vec<u8>, Option<String>), ApiError> {
        let response = Self::check(builder.send().await?, path).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = response.bytes().await?;
        Ok((bytes.to_vec(), content_type))
    }

    /// Turn non-success statuses into [`ApiError`]s.
    async fn check(response: Response, path: &str) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                path,
                body = %body.chars().take(500).collect::<String>(),
                "Backend returned server error"
            );
        } else {
            debug!(status = %status, path, "Backend returned client error");
        }

        Err(ApiError::from_status(status, &body, path, retry_after))
    }

    /// Look up a cached catalog value.
    pub(super) async fn cached(&self, key: &CacheKey) -> Option<CacheValue> {
        self.inner.cache.get(key).await
    }

    /// Store a catalog value.
    pub(super) async fn cache(&self, key: CacheKey, value: CacheValue) {
        self.inner.cache.insert(key, value).await;
    }

    /// Drop every cached catalog response.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }

    /// Check that the backend answers its health endpoint.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> bool {
        let Ok(builder) = self.request(Method::GET, "/health", None) else {
            return false;
        };
        match builder.send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "Backend health check failed");
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use comptoir_core::{AddressId, Email, ProductId, QuoteId, QuoteStatus, SearchHistoryId, UserId};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::backend::{
        AddressInput, PostulationRequest, ProductQuery, ProfileUpdate, QuoteItemInput,
        QuoteRequest,
    };

    fn client(api_url: &str) -> BackendClient {
        BackendClient::new(&BackendConfig::new(Url::parse(api_url).unwrap())).unwrap()
    }

    #[test]
    fn test_url_keeps_base_path() {
        let client = client("https://api.comptoir-pro.fr/api");
        assert_eq!(
            client.url("/favorites").unwrap().as_str(),
            "https://api.comptoir-pro.fr/api/favorites"
        );
        assert_eq!(
            client.url("devis/by-client/4").unwrap().as_str(),
            "https://api.comptoir-pro.fr/api/devis/by-client/4"
        );
    }

    #[test]
    fn test_url_with_trailing_slash_base() {
        let client = client("http://localhost:8080/");
        assert_eq!(
            client.url("/auth/regular-login").unwrap().as_str(),
            "http://localhost:8080/auth/regular-login"
        );
    }

    async fn mock_backend() -> (MockServer, BackendClient) {
        let server = MockServer::start().await;
        let client = client(&server.uri());
        (server, client)
    }

    fn token() -> SecretString {
        SecretString::from("jwt-abc")
    }

    #[tokio::test]
    async fn test_login_posts_credentials() {
        let (server, client) = mock_backend().await;
        Mock::given(method("POST"))
            .and(path("/auth/regular-login"))
            .and(body_json(serde_json::json!({
                "email": "claire@martin-plomberie.fr",
                "password": "secret"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "accessToken": "jwt-abc",
                "refreshToken": "refresh-abc",
                "user": {
                    "id": 4,
                    "email": "claire@martin-plomberie.fr",
                    "firstName": "Claire",
                    "lastName": "Martin",
                    "accountType": "PROFESSIONNEL"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let email = Email::parse("claire@martin-plomberie.fr").unwrap();
        let auth = client.login(&email, "secret").await.unwrap();
        assert_eq!(auth.access_token, "jwt-abc");
        assert_eq!(auth.user.id, UserId::new(4));
        assert_eq!(auth.user.full_name(), "Claire Martin");
    }

    #[tokio::test]
    async fn test_status_codes_map_to_errors() {
        let (server, client) = mock_backend().await;
        Mock::given(method("POST"))
            .and(path("/auth/regular-login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/postulations"))
            .respond_with(
                ResponseTemplate::new(409).set_body_json(serde_json::json!({"message": "Demande en cours"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/products/search"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let email = Email::parse("claire@martin-plomberie.fr").unwrap();
        assert!(matches!(
            client.login(&email, "wrong").await,
            Err(ApiError::Unauthorized)
        ));

        let request = crate::backend::PostulationRequest {
            user_id: UserId::new(4),
            company_name: "Martin Plomberie".to_string(),
            siret: "44306184100047".to_string(),
            activity: None,
            message: None,
        };
        match client.create_postulation(&token(), &request).await {
            Err(ApiError::Conflict(message)) => assert_eq!(message, "Demande en cours"),
            other => panic!("expected conflict, got {other:?}"),
        }

        assert!(matches!(
            client.search_products("tuyau", 0, 10).await,
            Err(ApiError::RateLimited(Some(30)))
        ));
        assert!(matches!(
            client.list_categories().await,
            Err(ApiError::Server { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_postulation_and_cart_are_not_errors() {
        let (server, client) = mock_backend().await;
        Mock::given(method("GET"))
            .and(path("/postulations/users/4"))
            .and(header("Authorization", "Bearer jwt-abc"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/carts/users/4"))
            .and(header("Authorization", "Bearer jwt-abc"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let user_id = UserId::new(4);
        assert!(client.get_postulation(&token(), user_id).await.unwrap().is_none());
        assert!(client.get_cart(&token(), user_id).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_listing_is_cached() {
        let (server, client) = mock_backend().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .and(query_param("page", "0"))
            .and(query_param("size", "24"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{
                    "id": 7,
                    "reference": "PER-16-100",
                    "name": "Tube PER 16 mm - couronne 100 m",
                    "price": "89.90",
                    "stock": 12
                }],
                "page": 0,
                "size": 24,
                "totalElements": 1,
                "totalPages": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let query = ProductQuery::default();
        let first = client.list_products(&query).await.unwrap();
        let second = client.list_products(&query).await.unwrap();
        assert_eq!(first.content.len(), 1);
        assert_eq!(second.content[0].id, ProductId::new(7));
    }

    #[tokio::test]
    async fn test_quote_document_keeps_content_type() {
        let (server, client) = mock_backend().await;
        Mock::given(method("GET"))
            .and(path("/devis/12/pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF-1.7".to_vec(), "application/pdf"))
            .mount(&server)
            .await;

        let document = client.quote_document(&token(), QuoteId::new(12)).await.unwrap();
        assert_eq!(document.content_type, "application/pdf");
        assert_eq!(document.bytes, b"%PDF-1.7");
    }

    fn address_json(id: i64, is_default: bool) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "label": "Chantier",
            "recipient": "Claire Martin",
            "street": "12 rue des Artisans",
            "postalCode": "69007",
            "city": "Lyon",
            "country": "France",
            "isDefault": is_default
        })
    }

    #[tokio::test]
    async fn test_address_book_endpoints() {
        let (server, client) = mock_backend().await;
        let input = AddressInput {
            label: Some("Chantier".to_string()),
            recipient: "Claire Martin".to_string(),
            street: "12 rue des Artisans".to_string(),
            postal_code: "69007".to_string(),
            city: "Lyon".to_string(),
            country: "France".to_string(),
            ..AddressInput::default()
        };
        let input_json = serde_json::to_value(&input).unwrap();
        assert_eq!(input_json["postalCode"], "69007");

        Mock::given(method("GET"))
            .and(path("/addresses/users/4"))
            .and(header("Authorization", "Bearer jwt-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([address_json(3, true)])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/addresses/users/4"))
            .and(body_json(&input_json))
            .respond_with(ResponseTemplate::new(201).set_body_json(address_json(3, false)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/addresses/3"))
            .and(body_json(&input_json))
            .respond_with(ResponseTemplate::new(200).set_body_json(address_json(3, false)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/addresses/3/default"))
            .respond_with(ResponseTemplate::new(200).set_body_json(address_json(3, true)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/addresses/3"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let user_id = UserId::new(4);
        let id = AddressId::new(3);
        let listed = client.list_addresses(&token(), user_id).await.unwrap();
        assert!(listed[0].is_default);
        let created = client.create_address(&token(), user_id, &input).await.unwrap();
        assert_eq!(created.id, id);
        client.update_address(&token(), id, &input).await.unwrap();
        assert!(client.set_default_address(&token(), id).await.unwrap().is_default);
        client.delete_address(&token(), id).await.unwrap();
    }

    fn quote_json(id: i64) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "reference": format!("DEV-2024-{id:04}"),
            "status": "PENDING",
            "lines": [{
                "productId": 7,
                "productName": "Tube PER 16 mm - couronne 100 m",
                "quantity": 2,
                "unitPrice": "89.90",
                "lineTotal": "179.80"
            }],
            "totalHt": "179.80",
            "totalTtc": "215.76",
            "createdAt": "2024-03-18T09:30:00Z"
        })
    }

    #[tokio::test]
    async fn test_quote_endpoints() {
        let (server, client) = mock_backend().await;
        Mock::given(method("POST"))
            .and(path("/devis"))
            .and(body_json(serde_json::json!({
                "clientId": 4,
                "items": [{"productId": 7, "quantity": 2}],
                "comment": "Livraison sur chantier"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(quote_json(12)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/devis/by-client/4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([quote_json(12)])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/devis/13"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let request = QuoteRequest {
            client_id: UserId::new(4),
            representative_id: None,
            items: vec![QuoteItemInput {
                product_id: ProductId::new(7),
                quantity: 2,
            }],
            comment: Some("Livraison sur chantier".to_string()),
        };
        let quote = client.create_quote(&token(), &request).await.unwrap();
        assert_eq!(quote.reference, "DEV-2024-0012");
        assert_eq!(quote.status, QuoteStatus::Pending);
        assert_eq!(quote.lines.len(), 1);

        let quotes = client.list_quotes(&token(), UserId::new(4)).await.unwrap();
        assert_eq!(quotes[0].id, QuoteId::new(12));

        assert!(matches!(
            client.get_quote(&token(), QuoteId::new(13)).await,
            Err(ApiError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_postulation_is_posted() {
        let (server, client) = mock_backend().await;
        Mock::given(method("POST"))
            .and(path("/postulations"))
            .and(body_json(serde_json::json!({
                "userId": 4,
                "companyName": "Martin Plomberie",
                "siret": "44306184100047",
                "activity": "Plomberie",
                "message": null
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": 2,
                "companyName": "Martin Plomberie",
                "siret": "44306184100047",
                "status": "PENDING"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = PostulationRequest {
            user_id: UserId::new(4),
            company_name: "Martin Plomberie".to_string(),
            siret: "44306184100047".to_string(),
            activity: Some("Plomberie".to_string()),
            message: None,
        };
        let postulation = client.create_postulation(&token(), &request).await.unwrap();
        assert_eq!(postulation.siret, "44306184100047");
    }

    #[tokio::test]
    async fn test_favorites_endpoints() {
        let (server, client) = mock_backend().await;
        Mock::given(method("GET"))
            .and(path("/favorites"))
            .and(query_param("page", "1"))
            .and(query_param("size", "12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"id": 31, "productId": 7}],
                "page": 1,
                "size": 12,
                "totalElements": 13,
                "totalPages": 2
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/favorites"))
            .and(body_json(serde_json::json!({"productId": 7})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 31, "productId": 7})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/favorites/7"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let page = client.list_favorites(&token(), 1, 12).await.unwrap();
        assert_eq!(page.total_elements, 13);
        assert!(!page.has_next());
        assert!(page.has_previous());

        let favorite = client.add_favorite(&token(), ProductId::new(7)).await.unwrap();
        assert_eq!(favorite.product_id, ProductId::new(7));
        assert!(matches!(
            client.remove_favorite(&token(), ProductId::new(7)).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search_history_endpoints() {
        let (server, client) = mock_backend().await;
        Mock::given(method("POST"))
            .and(path("/search-history"))
            .and(body_json(serde_json::json!({"query": "raccord laiton"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 5, "query": "raccord laiton"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search-history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{"id": 5, "query": "raccord laiton"}])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/search-history/5"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/search-history"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let saved = client.save_search(&token(), "raccord laiton").await.unwrap();
        assert_eq!(saved.id, SearchHistoryId::new(5));
        assert_eq!(client.list_search_history(&token()).await.unwrap().len(), 1);
        client.delete_search(&token(), saved.id).await.unwrap();
        client.clear_search_history(&token()).await.unwrap();
    }

    #[tokio::test]
    async fn test_account_endpoints() {
        let (server, client) = mock_backend().await;
        let user = serde_json::json!({
            "id": 4,
            "email": "claire@martin-plomberie.fr",
            "firstName": "Claire",
            "lastName": "Martin-Roux"
        });
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .and(body_json(serde_json::json!({"refreshToken": "refresh-abc"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "accessToken": "jwt-new",
                "user": user.clone()
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/change-password"))
            .and(header("Authorization", "Bearer jwt-abc"))
            .and(body_json(serde_json::json!({
                "currentPassword": "Chantier2024",
                "newPassword": "Chantier2025"
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/users/4"))
            .and(body_json(serde_json::json!({
                "firstName": "Claire",
                "lastName": "Martin-Roux",
                "phone": null,
                "companyName": null
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&user))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/forgot-password"))
            .and(body_json(serde_json::json!({"email": "claire@martin-plomberie.fr"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/reset-password"))
            .and(body_json(serde_json::json!({"token": "tok-1", "password": "Chantier2025"})))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({"message": "Lien expiré"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .and(header("Authorization", "Bearer jwt-abc"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let refreshed = client.refresh(&SecretString::from("refresh-abc")).await.unwrap();
        assert_eq!(refreshed.access_token, "jwt-new");
        assert!(refreshed.refresh_token.is_none());

        client
            .change_password(&token(), "Chantier2024", "Chantier2025")
            .await
            .unwrap();

        let update = ProfileUpdate {
            first_name: "Claire".to_string(),
            last_name: "Martin-Roux".to_string(),
            phone: None,
            company_name: None,
        };
        let updated = client.update_profile(&token(), UserId::new(4), &update).await.unwrap();
        assert_eq!(updated.full_name(), "Claire Martin-Roux");

        let email = Email::parse("claire@martin-plomberie.fr").unwrap();
        client.forgot_password(&email).await.unwrap();
        assert!(matches!(
            client.reset_password("tok-1", "Chantier2025").await,
            Err(ApiError::BadRequest(message)) if message == "Lien expiré"
        ));
        client.logout(&token()).await.unwrap();
    }

    #[tokio::test]
    async fn test_ping() {
        let (server, client) = mock_backend().await;
        assert!(!client.ping().await);

        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        assert!(client.ping().await);
    }
}
