//! Data-transfer shapes mirrored from the backend.
//!
//! All JSON is camelCase. Optional fields default so that an older backend
//! omitting a field still decodes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use comptoir_core::{
    AccountType, AddressId, CategoryId, Email, FavoriteId, PostulationId, PostulationStatus,
    Price, ProductId, QuoteId, QuoteStatus, RepresentativeId, SearchHistoryId, StockStatus,
    UserId,
};

// =============================================================================
// Pagination
// =============================================================================

/// Paginated response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    /// Zero-based page number.
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Whether another page follows this one.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page.saturating_add(1) < self.total_pages
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 0
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            content: Vec::new(),
            page: 0,
            size: 0,
            total_elements: 0,
            total_pages: 0,
        }
    }
}

/// Error body returned with 4xx/5xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
}

/// A catalog product.
///
/// Prices and promotions are computed by the backend; the helpers below only
/// choose what to display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub reference: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub promo_price: Option<Price>,
    #[serde(default)]
    pub stock: u32,
    /// Sales unit ("pièce", "mètre", "lot de 10"...).
    #[serde(default)]
    pub unit: Option<String>,
}

impl Product {
    /// Price the customer pays: the promotional price when it undercuts the
    /// regular one.
    #[must_use]
    pub fn effective_price(&self) -> Price {
        effective_price(self.price, self.promo_price)
    }

    #[must_use]
    pub fn is_on_promotion(&self) -> bool {
        self.effective_price() < self.price
    }

    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        self.price.discount_percent(self.effective_price())
    }

    #[must_use]
    pub const fn stock_status(&self) -> StockStatus {
        StockStatus::from_quantity(self.stock)
    }

    #[must_use]
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id,
            reference: self.reference.clone(),
            name: self.name.clone(),
            image_url: self.image_url.clone(),
            price: self.price,
            promo_price: self.promo_price,
        }
    }
}

/// The product fields embedded in favorites and carts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    #[serde(default)]
    pub reference: String,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub promo_price: Option<Price>,
}

impl ProductSummary {
    #[must_use]
    pub fn effective_price(&self) -> Price {
        effective_price(self.price, self.promo_price)
    }
}

fn effective_price(price: Price, promo_price: Option<Price>) -> Price {
    promo_price.filter(|promo| *promo < price).unwrap_or(price)
}

// =============================================================================
// Users & auth
// =============================================================================

/// A customer account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub account_type: AccountType,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Response of a successful login or token refresh.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Account creation payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Email,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

/// Profile fields the customer can edit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub company_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest<'a> {
    pub current_password: &'a str,
    pub new_password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordRequest<'a> {
    pub token: &'a str,
    pub password: &'a str,
}

// =============================================================================
// Favorites
// =============================================================================

/// A user-product bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: FavoriteId,
    pub product_id: ProductId,
    #[serde(default)]
    pub product: Option<ProductSummary>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Addresses
// =============================================================================

fn default_country() -> String {
    "France".to_string()
}

/// A delivery or billing address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    #[serde(default)]
    pub label: Option<String>,
    pub recipient: String,
    pub street: String,
    #[serde(default)]
    pub complement: Option<String>,
    pub postal_code: String,
    pub city: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// Address create/update payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub label: Option<String>,
    pub recipient: String,
    pub street: String,
    pub complement: Option<String>,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    pub phone: Option<String>,
    pub is_default: bool,
}

impl AddressInput {
    /// Check the fields the form cannot enforce by itself.
    ///
    /// # Errors
    ///
    /// Returns the French message of the first invalid field.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.recipient.trim().is_empty() {
            return Err("Le destinataire est obligatoire");
        }
        if self.street.trim().is_empty() {
            return Err("L'adresse est obligatoire");
        }
        if self.city.trim().is_empty() {
            return Err("La ville est obligatoire");
        }
        let postal_code = self.postal_code.trim();
        if self.country.trim().eq_ignore_ascii_case("france")
            && (postal_code.len() != 5 || !postal_code.chars().all(|c| c.is_ascii_digit()))
        {
            return Err("Le code postal doit comporter 5 chiffres");
        }
        if postal_code.is_empty() {
            return Err("Le code postal est obligatoire");
        }
        Ok(())
    }
}

impl From<&Address> for AddressInput {
    fn from(address: &Address) -> Self {
        Self {
            label: address.label.clone(),
            recipient: address.recipient.clone(),
            street: address.street.clone(),
            complement: address.complement.clone(),
            postal_code: address.postal_code.clone(),
            city: address.city.clone(),
            country: address.country.clone(),
            phone: address.phone.clone(),
            is_default: address.is_default,
        }
    }
}

// =============================================================================
// Quotes (devis)
// =============================================================================

/// A sales representative who prepares quotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Representative {
    pub id: RepresentativeId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl Representative {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// One product line of a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLine {
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(default)]
    pub reference: Option<String>,
    pub quantity: u32,
    pub unit_price: Price,
    pub line_total: Price,
}

/// A price quotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: QuoteId,
    pub reference: String,
    #[serde(default)]
    pub status: QuoteStatus,
    #[serde(default)]
    pub lines: Vec<QuoteLine>,
    pub total_ht: Price,
    pub total_ttc: Price,
    #[serde(default)]
    pub representative: Option<Representative>,
    #[serde(default)]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteItemInput {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Quote request built from the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub client_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub representative_id: Option<RepresentativeId>,
    pub items: Vec<QuoteItemInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

// =============================================================================
// Search history
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryEntry {
    pub id: SearchHistoryId,
    pub query: String,
    #[serde(default)]
    pub searched_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Server-side cart
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Present in responses, omitted in requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCart {
    #[serde(default)]
    pub items: Vec<ServerCartItem>,
}

// =============================================================================
// Postulations
// =============================================================================

/// A request for professional-account pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Postulation {
    pub id: PostulationId,
    pub company_name: String,
    pub siret: String,
    #[serde(default)]
    pub activity: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: PostulationStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostulationRequest {
    pub user_id: UserId,
    pub company_name: String,
    pub siret: String,
    pub activity: Option<String>,
    pub message: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product_json() -> serde_json::Value {
        serde_json::json!({
            "id": 7,
            "reference": "PER-16-100",
            "name": "Tube PER 16 mm - couronne 100 m",
            "brand": "Comap",
            "price": "89.90",
            "promoPrice": "74.90",
            "stock": 3
        })
    }

    #[test]
    fn test_product_decodes_with_missing_optionals() {
        let product: Product = serde_json::from_value(product_json()).unwrap();
        assert_eq!(product.id, ProductId::new(7));
        assert!(product.description.is_none());
        assert!(product.is_on_promotion());
        assert_eq!(product.effective_price(), Price::from_cents(7490));
        assert_eq!(product.discount_percent(), Some(17));
        assert_eq!(product.stock_status(), StockStatus::LowStock);
    }

    #[test]
    fn test_promo_price_above_regular_is_ignored() {
        let mut product: Product = serde_json::from_value(product_json()).unwrap();
        product.promo_price = Some(Price::from_cents(9990));
        assert_eq!(product.effective_price(), Price::from_cents(8990));
        assert!(!product.is_on_promotion());
        assert!(product.discount_percent().is_none());
    }

    #[test]
    fn test_page_navigation() {
        let page: Page<Favorite> = serde_json::from_value(serde_json::json!({
            "content": [],
            "page": 0,
            "size": 12,
            "totalElements": 30,
            "totalPages": 3
        }))
        .unwrap();
        assert!(page.has_next());
        assert!(!page.has_previous());

        let last = Page::<Favorite> {
            page: 2,
            total_pages: 3,
            ..Page::default()
        };
        assert!(!last.has_next());

        let runaway = Page::<Favorite> {
            page: u32::MAX,
            total_pages: u32::MAX,
            ..Page::default()
        };
        assert!(!runaway.has_next());
    }

    #[test]
    fn test_page_without_content_decodes() {
        let page: Page<Product> = serde_json::from_value(serde_json::json!({
            "page": 0,
            "totalElements": 0
        }))
        .unwrap();
        assert!(page.content.is_empty());
        assert!(!page.has_next());
    }

    #[test]
    fn test_address_validation() {
        let mut input = AddressInput {
            recipient: "SARL Martin Chauffage".to_string(),
            street: "12 rue des Artisans".to_string(),
            postal_code: "69003".to_string(),
            city: "Lyon".to_string(),
            country: "France".to_string(),
            ..AddressInput::default()
        };
        assert!(input.validate().is_ok());

        input.postal_code = "6900".to_string();
        assert_eq!(
            input.validate(),
            Err("Le code postal doit comporter 5 chiffres")
        );

        input.country = "Belgique".to_string();
        input.postal_code = "1000".to_string();
        assert!(input.validate().is_ok());

        input.city = "  ".to_string();
        assert_eq!(input.validate(), Err("La ville est obligatoire"));
    }

    #[test]
    fn test_quote_request_omits_empty_optionals() {
        let request = QuoteRequest {
            client_id: UserId::new(3),
            representative_id: None,
            items: vec![QuoteItemInput {
                product_id: ProductId::new(7),
                quantity: 2,
            }],
            comment: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"clientId": 3, "items": [{"productId": 7, "quantity": 2}]})
        );
    }
}
