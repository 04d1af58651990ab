//! Shopping cart held in the visitor session.
//!
//! Guests keep the cart in the session only. For logged-in customers every
//! mutation is also pushed to `/carts/users/{id}`; a failed push is logged and
//! never fails the request.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use comptoir_core::{Price, ProductId};

use crate::backend::{BackendClient, Product, ProductSummary, ServerCart, ServerCartItem};
use crate::models::{CurrentUser, session_keys};

/// Highest quantity a single line may hold.
pub const MAX_QUANTITY: u32 = 999;

/// Clamp a requested quantity into `1..=MAX_QUANTITY`.
#[must_use]
pub fn clamp_quantity(quantity: u32) -> u32 {
    quantity.clamp(1, MAX_QUANTITY)
}

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub reference: String,
    pub image_url: Option<String>,
    pub unit_price: Price,
    pub promo_price: Option<Price>,
    pub quantity: u32,
}

impl CartLine {
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self::from_summary(&product.summary(), quantity)
    }

    #[must_use]
    pub fn from_summary(product: &ProductSummary, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            reference: product.reference.clone(),
            image_url: product.image_url.clone(),
            unit_price: product.price,
            promo_price: product.promo_price,
            quantity: clamp_quantity(quantity),
        }
    }

    /// Unit price actually charged.
    #[must_use]
    pub fn effective_price(&self) -> Price {
        self.promo_price
            .filter(|promo| *promo < self.unit_price)
            .unwrap_or(self.unit_price)
    }

    #[must_use]
    pub fn total(&self) -> Price {
        self.effective_price() * self.quantity
    }
}

/// The visitor's cart, one line per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    /// Add a line, summing quantities when the product is already present.
    pub fn add(&mut self, line: CartLine) {
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|existing| existing.product_id == line.product_id)
        {
            existing.quantity = clamp_quantity(existing.quantity.saturating_add(line.quantity));
            existing.unit_price = line.unit_price;
            existing.promo_price = line.promo_price;
        } else {
            self.lines.push(CartLine {
                quantity: clamp_quantity(line.quantity),
                ..line
            });
        }
    }

    /// Set the quantity of a line. Zero removes it.
    ///
    /// Returns `false` when the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(product_id);
        }
        match self.lines.iter_mut().find(|line| line.product_id == product_id) {
            Some(line) => {
                line.quantity = clamp_quantity(quantity);
                true
            }
            None => false,
        }
    }

    /// Returns `false` when the product was not in the cart.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id != product_id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Total number of units across lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.lines.iter().map(CartLine::total).sum()
    }

    /// Fold another cart into this one, summing quantities per product.
    pub fn merge(&mut self, other: Self) {
        for line in other.lines {
            self.add(line);
        }
    }

    #[must_use]
    pub fn to_server(&self) -> ServerCart {
        ServerCart {
            items: self
                .lines
                .iter()
                .map(|line| ServerCartItem {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    product: None,
                })
                .collect(),
        }
    }

    /// Rebuild a cart from the backend copy. Items the backend returns
    /// without product details cannot be displayed and are dropped.
    #[must_use]
    pub fn from_server(server: &ServerCart) -> Self {
        let mut cart = Self::default();
        for item in &server.items {
            match &item.product {
                Some(product) => cart.add(CartLine::from_summary(product, item.quantity)),
                None => tracing::warn!(
                    product_id = %item.product_id,
                    "Dropping server cart item without product details"
                ),
            }
        }
        cart
    }
}

/// Read the cart from the session, empty if absent.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load(session: &Session) -> Result<Cart, tower_sessions::session::Error> {
    Ok(session.get(session_keys::CART).await?.unwrap_or_default())
}

/// Write the cart back to the session.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn store(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, cart).await
}

/// Persist the cart server-side for a logged-in customer. Failures are logged.
#[instrument(skip_all, fields(user_id = %user.id, lines = cart.lines().len()))]
pub async fn push(backend: &BackendClient, user: &CurrentUser, cart: &Cart) {
    if let Err(e) = backend
        .save_cart(&user.access_token, user.id, &cart.to_server())
        .await
    {
        tracing::warn!(error = %e, "Failed to save cart to backend");
    }
}

/// Store the cart and, when logged in, push it to the backend.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save(
    session: &Session,
    backend: &BackendClient,
    user: Option<&CurrentUser>,
    cart: &Cart,
) -> Result<(), tower_sessions::session::Error> {
    store(session, cart).await?;
    if let Some(user) = user {
        push(backend, user, cart).await;
    }
    Ok(())
}

/// Merge the guest cart into the customer's saved cart after login.
///
/// If the saved cart cannot be fetched, the guest cart is kept as is.
///
/// # Errors
///
/// Returns an error if the session store fails.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn sync_on_login(
    session: &Session,
    backend: &BackendClient,
    user: &CurrentUser,
) -> Result<Cart, tower_sessions::session::Error> {
    let guest = load(session).await?;

    // A missing saved cart comes back as an empty one. Any other failure
    // leaves the saved cart untouched on the backend.
    let mut cart = match backend.get_cart(&user.access_token, user.id).await {
        Ok(server) => Cart::from_server(&server),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch saved cart, keeping guest cart");
            return Ok(guest);
        }
    };

    let had_guest_lines = !guest.is_empty();
    cart.merge(guest);
    store(session, &cart).await?;

    if had_guest_lines {
        push(backend, user, &cart).await;
    }

    Ok(cart)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i64, cents: i64, promo: Option<i64>, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            name: format!("Produit {id}"),
            reference: format!("REF-{id}"),
            image_url: None,
            unit_price: Price::from_cents(cents),
            promo_price: promo.map(Price::from_cents),
            quantity,
        }
    }

    #[test]
    fn test_add_same_product_sums_quantity() {
        let mut cart = Cart::default();
        cart.add(line(1, 1000, None, 2));
        cart.add(line(1, 1000, None, 3));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_add_clamps_quantity() {
        let mut cart = Cart::default();
        cart.add(line(1, 1000, None, 0));
        assert_eq!(cart.item_count(), 1);

        cart.add(line(1, 1000, None, 5000));
        assert_eq!(cart.item_count(), MAX_QUANTITY);
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let mut cart = Cart::default();
        cart.add(line(1, 1000, None, 2));
        cart.add(line(2, 500, None, 1));

        assert!(cart.set_quantity(ProductId::new(1), 0));
        assert_eq!(cart.lines().len(), 1);
        assert!(cart.line(ProductId::new(1)).is_none());
    }

    #[test]
    fn test_set_quantity_unknown_product() {
        let mut cart = Cart::default();
        assert!(!cart.set_quantity(ProductId::new(9), 3));
        assert!(!cart.remove(ProductId::new(9)));
    }

    #[test]
    fn test_subtotal_uses_effective_price() {
        let mut cart = Cart::default();
        cart.add(line(1, 1000, Some(800), 2));
        // A promo above the regular price is ignored.
        cart.add(line(2, 500, Some(700), 1));
        assert_eq!(cart.subtotal(), Price::from_cents(2100));
    }

    #[test]
    fn test_merge_sums_per_product() {
        let mut server = Cart::default();
        server.add(line(1, 1000, None, 1));
        server.add(line(2, 500, None, 4));

        let mut guest = Cart::default();
        guest.add(line(2, 500, None, 1));
        guest.add(line(3, 250, None, 2));

        server.merge(guest);
        assert_eq!(server.lines().len(), 3);
        assert_eq!(server.line(ProductId::new(2)).map(|l| l.quantity), Some(5));
        assert_eq!(server.item_count(), 8);
    }

    #[test]
    fn test_server_round_trip_keeps_quantities() {
        let mut cart = Cart::default();
        cart.add(line(1, 1000, None, 3));
        let server = cart.to_server();
        assert_eq!(server.items.len(), 1);
        assert_eq!(server.items[0].quantity, 3);
        assert!(server.items[0].product.is_none());
    }

    #[test]
    fn test_from_server_drops_items_without_product() {
        let server = ServerCart {
            items: vec![
                ServerCartItem {
                    product_id: ProductId::new(1),
                    quantity: 2,
                    product: Some(ProductSummary {
                        id: ProductId::new(1),
                        reference: "REF-1".to_string(),
                        name: "Coude laiton".to_string(),
                        image_url: None,
                        price: Price::from_cents(350),
                        promo_price: None,
                    }),
                },
                ServerCartItem {
                    product_id: ProductId::new(2),
                    quantity: 1,
                    product: None,
                },
            ],
        };
        let cart = Cart::from_server(&server);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.subtotal(), Price::from_cents(700));
    }
}
