//! Integration tests for search and search history.

use comptoir_integration_tests::{TestApp, page_json, product_json};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

async fn mock_search(app: &TestApp) {
    Mock::given(method("GET"))
        .and(path("/products/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&[product_json(7, 12)])))
        .mount(&app.backend)
        .await;
}

#[tokio::test]
async fn test_results_page_lists_products() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/products/search"))
        .and(query_param("q", "tuyau cuivre"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&[product_json(7, 12)])))
        .expect(1)
        .mount(&app.backend)
        .await;

    let resp = app.get("/search?q=%20%20tuyau%20%20%20cuivre%20").await;
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("Tuyau cuivre 14 mm (7)"));
}

#[tokio::test]
async fn test_query_differing_only_by_case_is_saved_once() {
    let app = TestApp::spawn().await;
    app.login().await;
    mock_search(&app).await;
    Mock::given(method("POST"))
        .and(path("/search-history"))
        .and(body_json(json!({"query": "Tuyau"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1, "query": "Tuyau"})))
        .expect(1)
        .mount(&app.backend)
        .await;

    assert_eq!(app.get("/search?q=Tuyau").await.status(), 200);
    assert_eq!(app.get("/search?q=tuyau").await.status(), 200);
}

#[tokio::test]
async fn test_guest_history_lives_in_session() {
    let app = TestApp::spawn().await;
    mock_search(&app).await;

    app.get("/search?q=Tuyau").await;
    app.get("/search?q=tuyau").await;
    app.get("/search?q=raccord").await;

    let history = app.fragment("/search/history").await;
    assert_eq!(history.matches("<li>").count(), 2);
    assert!(history.find("raccord") < history.find("Tuyau"));

    let resp = app
        .post_form_htmx("/search/history/0/delete", &[("query", "raccord")])
        .await;
    let history = resp.text().await.expect("Failed to read body");
    assert_eq!(history.matches("<li>").count(), 1);
    assert!(!history.contains("raccord"));

    let resp = app.post_form_htmx("/search/history/clear", &[]).await;
    let history = resp.text().await.expect("Failed to read body");
    assert!(history.contains("Aucune recherche récente."));
}

#[tokio::test]
async fn test_short_query_gets_no_suggestions() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/products/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&[])))
        .expect(0)
        .mount(&app.backend)
        .await;

    let resp = app.get_htmx("/search/suggest?q=t").await;
    assert_eq!(resp.status(), 200);
}
