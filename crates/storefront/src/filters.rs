//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Cache-busting token for static assets: the crate version.
///
/// Usage in templates: `{{ ""|asset_version }}`
#[askama::filter_fn]
pub fn asset_version(
    _value: impl Display,
    _env: &dyn askama::Values,
) -> askama::Result<&'static str> {
    Ok(env!("CARGO_PKG_VERSION"))
}

/// `1 article` / `3 articles`.
///
/// Usage in templates: `{{ count|articles }}`
#[askama::filter_fn]
pub fn articles(count: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let count = count.to_string();
    let plural = if count == "0" || count == "1" { "" } else { "s" };
    Ok(format!("{count} article{plural}"))
}
