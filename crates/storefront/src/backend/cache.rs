//! Cache types for public catalog responses.

use comptoir_core::ProductId;

use super::products::ProductQuery;
use super::types::{Category, Page, Product};

/// Cache key for catalog reads. Only anonymous, public data is cached.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Products(ProductQuery),
    Promotions,
    Categories,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Page<Product>),
    Promotions(Vec<Product>),
    Categories(Vec<Category>),
}
