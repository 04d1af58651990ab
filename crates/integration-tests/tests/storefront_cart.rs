//! Integration tests for the session cart and its backend persistence.

use comptoir_integration_tests::{TestApp, location, product_json};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_adding_same_product_sums_quantities() {
    let app = TestApp::spawn().await;
    app.mock_product(7, 40).await;

    let resp = app
        .post_form("/cart/add", &[("product_id", "7"), ("quantity", "2")])
        .await;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/cart");

    let resp = app
        .post_form_htmx("/cart/add", &[("product_id", "7"), ("quantity", "3")])
        .await;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("hx-trigger").and_then(|v| v.to_str().ok()),
        Some("cart-updated")
    );
    assert_eq!(resp.text().await.expect("Failed to read body").trim(), "5");

    assert_eq!(app.fragment("/cart/count").await, "5");
}

#[tokio::test]
async fn test_out_of_stock_product_is_refused() {
    let app = TestApp::spawn().await;
    app.mock_product(9, 0).await;

    let resp = app.post_form("/cart/add", &[("product_id", "9")]).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(app.fragment("/cart/count").await, "");
}

#[tokio::test]
async fn test_update_to_zero_removes_line() {
    let app = TestApp::spawn().await;
    app.mock_product(7, 40).await;
    app.post_form("/cart/add", &[("product_id", "7")]).await;

    let resp = app
        .post_form_htmx("/cart/update", &[("product_id", "7"), ("quantity", "0")])
        .await;
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("Votre panier est vide"));
    assert_eq!(app.fragment("/cart/count").await, "");
}

#[tokio::test]
async fn test_guest_cart_merges_into_saved_cart_on_login() {
    let app = TestApp::spawn().await;
    app.mock_product(7, 40).await;
    Mock::given(method("GET"))
        .and(path("/carts/users/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"productId": 9, "quantity": 1, "product": product_json(9, 5)}]
        })))
        .with_priority(1)
        .mount(&app.backend)
        .await;
    Mock::given(method("PUT"))
        .and(path("/carts/users/4"))
        .and(body_json(json!({
            "items": [
                {"productId": 9, "quantity": 1},
                {"productId": 7, "quantity": 2}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .with_priority(1)
        .expect(1)
        .mount(&app.backend)
        .await;

    app.post_form("/cart/add", &[("product_id", "7"), ("quantity", "2")])
        .await;
    app.login().await;

    assert_eq!(app.fragment("/cart/count").await, "3");
}

#[tokio::test]
async fn test_saved_cart_untouched_when_backend_fails_at_login() {
    let app = TestApp::spawn().await;
    app.mock_product(7, 40).await;
    Mock::given(method("GET"))
        .and(path("/carts/users/4"))
        .respond_with(ResponseTemplate::new(503))
        .with_priority(1)
        .mount(&app.backend)
        .await;
    Mock::given(method("PUT"))
        .and(path("/carts/users/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .with_priority(1)
        .expect(0)
        .mount(&app.backend)
        .await;

    app.post_form("/cart/add", &[("product_id", "7"), ("quantity", "2")])
        .await;
    app.login().await;

    assert_eq!(app.fragment("/cart/count").await, "2");
}
