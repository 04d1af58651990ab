//! Display data shared by several templates.
//!
//! Templates get preformatted strings; prices and dates are formatted here in
//! French conventions.

use chrono::{DateTime, NaiveDate, Utc};

use comptoir_core::Price;

use crate::backend::{Page, Product, ProductSummary};
use crate::models::CurrentUser;

/// Header state: who is logged in and the current search.
#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub user_name: Option<String>,
    pub is_pro: bool,
    pub search_query: String,
}

impl Nav {
    #[must_use]
    pub fn new(user: Option<&CurrentUser>) -> Self {
        Self {
            user_name: user.map(CurrentUser::display_name),
            is_pro: user.is_some_and(CurrentUser::is_professional),
            search_query: String::new(),
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: &str) -> Self {
        self.search_query = query.to_string();
        self
    }

    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.user_name.is_some()
    }
}

/// A product tile.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub id: i64,
    pub name: String,
    pub reference: String,
    pub image_url: Option<String>,
    pub price: String,
    /// Regular price, shown struck through during a promotion.
    pub original_price: Option<String>,
    pub discount: Option<u32>,
    pub stock_label: &'static str,
    pub stock_class: &'static str,
    pub available: bool,
    pub is_favorite: bool,
}

impl ProductCard {
    #[must_use]
    pub fn from_product(product: &Product, is_favorite: bool) -> Self {
        let status = product.stock_status();
        let on_promotion = product.is_on_promotion();
        Self {
            id: product.id.as_i64(),
            name: product.name.clone(),
            reference: product.reference.clone(),
            image_url: product.image_url.clone(),
            price: product.effective_price().display(),
            original_price: on_promotion.then(|| product.price.display()),
            discount: product.discount_percent(),
            stock_label: status.label(),
            stock_class: status.css_class(),
            available: status.is_available(),
            is_favorite,
        }
    }

    /// Card for a product known only by its summary (favorites). Stock is
    /// unknown there, so the card stays orderable.
    #[must_use]
    pub fn from_summary(product: &ProductSummary, is_favorite: bool) -> Self {
        let effective = product.effective_price();
        Self {
            id: product.id.as_i64(),
            name: product.name.clone(),
            reference: product.reference.clone(),
            image_url: product.image_url.clone(),
            price: effective.display(),
            original_price: (effective < product.price).then(|| product.price.display()),
            discount: product.price.discount_percent(effective),
            stock_label: "",
            stock_class: "",
            available: true,
            is_favorite,
        }
    }
}

/// Previous/next links for a paginated listing.
#[derive(Debug, Clone, Default)]
pub struct Pager {
    /// One-based page number for display.
    pub current: u32,
    pub total: u32,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

impl Pager {
    /// Build links from a zero-based backend page. `url_for` receives the
    /// zero-based page to link to.
    pub fn new<T>(page: &Page<T>, url_for: impl Fn(u32) -> String) -> Self {
        Self {
            current: page.page + 1,
            total: page.total_pages.max(1),
            prev_url: page.has_previous().then(|| url_for(page.page - 1)),
            next_url: page.has_next().then(|| url_for(page.page + 1)),
        }
    }

    #[must_use]
    pub const fn is_needed(&self) -> bool {
        self.total > 1
    }
}

/// Format a price for display.
#[must_use]
pub fn price(value: Price) -> String {
    value.display()
}

/// `15/10/2026`
#[must_use]
pub fn date(value: &DateTime<Utc>) -> String {
    value.format("%d/%m/%Y").to_string()
}

#[must_use]
pub fn naive_date(value: &NaiveDate) -> String {
    value.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use comptoir_core::ProductId;

    use super::*;

    fn product(stock: u32, promo: Option<i64>) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": 3,
            "reference": "VAN-1/2",
            "name": "Vanne 1/2\"",
            "price": "12.00",
            "promoPrice": promo.map(|cents| Price::from_cents(cents).amount().to_string()),
            "stock": stock
        }))
        .unwrap()
    }

    #[test]
    fn test_card_shows_promotion() {
        let card = ProductCard::from_product(&product(10, Some(900)), false);
        assert_eq!(card.price, "9,00 €");
        assert_eq!(card.original_price.as_deref(), Some("12,00 €"));
        assert_eq!(card.discount, Some(25));
        assert!(card.available);
    }

    #[test]
    fn test_card_without_promotion() {
        let card = ProductCard::from_product(&product(0, None), true);
        assert_eq!(card.price, "12,00 €");
        assert!(card.original_price.is_none());
        assert!(!card.available);
        assert!(card.is_favorite);
    }

    #[test]
    fn test_summary_card() {
        let summary = ProductSummary {
            id: ProductId::new(3),
            reference: "VAN".to_string(),
            name: "Vanne".to_string(),
            image_url: None,
            price: Price::from_cents(1200),
            promo_price: None,
        };
        let card = ProductCard::from_summary(&summary, true);
        assert_eq!(card.price, "12,00 €");
        assert!(card.available);
    }

    #[test]
    fn test_pager_links() {
        let page: Page<()> = Page {
            content: Vec::new(),
            page: 1,
            size: 24,
            total_elements: 60,
            total_pages: 3,
        };
        let pager = Pager::new(&page, |p| format!("/products?page={p}"));
        assert_eq!(pager.current, 2);
        assert_eq!(pager.prev_url.as_deref(), Some("/products?page=0"));
        assert_eq!(pager.next_url.as_deref(), Some("/products?page=2"));
        assert!(pager.is_needed());
    }

    #[test]
    fn test_date_format() {
        let value = DateTime::parse_from_rfc3339("2026-10-15T08:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(date(&value), "15/10/2026");
    }
}
