//! Integration test harness for the Comptoir storefront.
//!
//! Each test spawns the real storefront router on an ephemeral port, pointed
//! at a `wiremock` server standing in for the commerce backend. Nothing else
//! needs to be running:
//!
//! ```bash
//! cargo test -p comptoir-integration-tests
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let app = TestApp::spawn().await;
//! app.mock_product(7, 12).await;
//! let resp = app.post_form("/cart/add", &[("product_id", "7")]).await;
//! assert_eq!(resp.status(), 303);
//! ```

use std::net::SocketAddr;

use reqwest::{Client, Response, redirect::Policy};
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use comptoir_storefront::{
    app,
    config::{BackendConfig, SentryConfig, StorefrontConfig},
    state::AppState,
};

/// Customer every logged-in test uses.
pub const USER_ID: i64 = 4;
pub const USER_EMAIL: &str = "claire@martin-plomberie.fr";
pub const USER_PASSWORD: &str = "Chantier2024";

/// A running storefront and its fake backend.
pub struct TestApp {
    /// Storefront base URL, e.g. `http://127.0.0.1:41234`.
    pub address: String,
    pub backend: MockServer,
    /// Keeps the session cookie; never follows redirects.
    pub client: Client,
}

impl TestApp {
    /// Start a fake backend and a storefront pointed at it.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound or the app cannot be built.
    pub async fn spawn() -> Self {
        let backend = MockServer::start().await;
        let api_url = Url::parse(&backend.uri()).expect("mock server URI is a valid URL");

        let config = StorefrontConfig {
            host: [127, 0, 0, 1].into(),
            port: 0,
            base_url: "http://127.0.0.1".to_string(),
            backend: BackendConfig::new(api_url),
            session_expiry_hours: 1,
            sentry: SentryConfig::default(),
        };
        let state = AppState::new(config).expect("Failed to build application state");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("listener has a local address");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app(state).into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server failed");
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            address: format!("http://{addr}"),
            backend,
            client,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.address)
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// GET as htmx does, with the `HX-Request` header.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get_htmx(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .header("HX-Request", "true")
            .send()
            .await
            .expect("GET request failed")
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post_form_htmx(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .header("HX-Request", "true")
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Text of a fragment endpoint, trimmed.
    ///
    /// # Panics
    ///
    /// Panics if the request or the body read fails.
    pub async fn fragment(&self, path: &str) -> String {
        self.get_htmx(path)
            .await
            .text()
            .await
            .expect("Failed to read body")
            .trim()
            .to_string()
    }

    /// Serve a product from the catalog.
    pub async fn mock_product(&self, id: i64, stock: u32) {
        Mock::given(method("GET"))
            .and(path(format!("/products/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(product_json(id, stock)))
            .mount(&self.backend)
            .await;
    }

    /// Log the test customer in. The backend has no saved cart and no
    /// favorites unless a test mounts its own mocks first.
    ///
    /// # Panics
    ///
    /// Panics if the storefront does not accept the login.
    pub async fn login(&self) {
        Mock::given(method("POST"))
            .and(path("/auth/regular-login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accessToken": "jwt-claire",
                "refreshToken": "refresh-claire",
                "user": user_json()
            })))
            .mount(&self.backend)
            .await;
        Mock::given(path_regex(r"^/carts/users/\d+$"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&self.backend)
            .await;
        Mock::given(method("GET"))
            .and(path("/favorites"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&[])))
            .mount(&self.backend)
            .await;

        let resp = self
            .post_form(
                "/auth/login",
                &[("email", USER_EMAIL), ("password", USER_PASSWORD)],
            )
            .await;
        assert_eq!(resp.status(), 303, "login should redirect");
        assert_eq!(location(&resp), "/account");
    }
}

/// `Location` header of a redirect, empty if absent.
#[must_use]
pub fn location(resp: &Response) -> String {
    resp.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[must_use]
pub fn user_json() -> Value {
    json!({
        "id": USER_ID,
        "email": USER_EMAIL,
        "firstName": "Claire",
        "lastName": "Martin",
        "accountType": "PARTICULIER"
    })
}

#[must_use]
pub fn product_json(id: i64, stock: u32) -> Value {
    json!({
        "id": id,
        "reference": format!("REF-{id}"),
        "name": format!("Tuyau cuivre 14 mm ({id})"),
        "brand": "Comap",
        "price": "12.50",
        "stock": stock
    })
}

/// A single-page backend envelope.
#[must_use]
pub fn page_json(content: &[Value]) -> Value {
    json!({
        "content": content,
        "page": 0,
        "size": 12,
        "totalElements": content.len(),
        "totalPages": u32::from(!content.is_empty())
    })
}
