//! Session expiry redirects.
//!
//! A handler that hits a backend 401 answers with a plain redirect to
//! `/auth/expired` tagged with [`SessionExpired`]. This layer knows the
//! request, so it adds `?next=` and picks the htmx or the browser form of the
//! redirect: htmx ignores headers on 3xx responses and its XHR follows them
//! silently, so htmx requests get a 401 with `HX-Redirect` instead.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header::REFERER},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::error::{SESSION_EXPIRED_PATH, SessionExpired};

use super::auth::HX_REQUEST;

/// Path and query of an absolute URL.
fn url_path(url: &str) -> Option<String> {
    let url = url::Url::parse(url).ok()?;
    Some(match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    })
}

fn header_path(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(url_path)
}

/// Page the visitor should land on once the session is renewed.
///
/// htmx fragments return to the page that loaded them, page loads to
/// themselves, and form posts to the page holding the form.
fn return_path(request: &Request) -> Option<String> {
    let headers = request.headers();
    if headers.contains_key(HX_REQUEST) {
        header_path(headers, "hx-current-url")
    } else if matches!(*request.method(), Method::GET | Method::HEAD) {
        request.uri().path_and_query().map(ToString::to_string)
    } else {
        header_path(headers, REFERER.as_str())
    }
}

/// `/auth/expired`, with `next` when there is somewhere to return to.
#[must_use]
pub fn expired_url(next: Option<&str>) -> String {
    match next.filter(|n| *n != "/" && !n.starts_with(SESSION_EXPIRED_PATH)) {
        Some(next) => format!("{SESSION_EXPIRED_PATH}?next={}", urlencoding::encode(next)),
        None => SESSION_EXPIRED_PATH.to_string(),
    }
}

/// Rewrite responses tagged [`SessionExpired`] for the request that caused them.
pub async fn session_expiry_middleware(request: Request, next: Next) -> Response {
    let is_htmx = request.headers().contains_key(HX_REQUEST);
    let return_to = return_path(&request);

    let response = next.run(request).await;
    if response.extensions().get::<SessionExpired>().is_none() {
        return response;
    }

    let target = expired_url(return_to.as_deref());
    if is_htmx {
        let mut response = StatusCode::UNAUTHORIZED.into_response();
        if let Ok(value) = HeaderValue::from_str(&target) {
            response.headers_mut().insert("hx-redirect", value);
        }
        response
    } else {
        Redirect::to(&target).into_response()
    }
}
