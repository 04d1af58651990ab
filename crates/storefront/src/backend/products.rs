//! Catalog endpoints: products, promotions, categories and search.

use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, instrument};

use comptoir_core::{CategoryId, ProductId};

use super::cache::{CacheKey, CacheValue};
use super::types::{Category, Page, Product};
use super::{ApiError, BackendClient};

/// Default number of products per listing page.
pub const DEFAULT_PAGE_SIZE: u32 = 24;

/// Listing sort order, as the backend names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    Newest,
    Name,
}

impl ProductSort {
    /// Parse a query-string value, falling back to relevance.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "price_asc" => Self::PriceAsc,
            "price_desc" => Self::PriceDesc,
            "newest" => Self::Newest,
            "name" => Self::Name,
            _ => Self::Relevance,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Newest => "newest",
            Self::Name => "name",
        }
    }

    /// Value of the backend's `sort` parameter.
    const fn backend_param(self) -> Option<&'static str> {
        match self {
            Self::Relevance => None,
            Self::PriceAsc => Some("price,asc"),
            Self::PriceDesc => Some("price,desc"),
            Self::Newest => Some("createdAt,desc"),
            Self::Name => Some("name,asc"),
        }
    }
}

/// Product listing parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    pub page: u32,
    pub size: u32,
    pub category: Option<CategoryId>,
    pub sort: ProductSort,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            category: None,
            sort: ProductSort::Relevance,
        }
    }
}

impl ProductQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", self.page.to_string()), ("size", self.size.to_string())];
        if let Some(category) = self.category {
            params.push(("category", category.to_string()));
        }
        if let Some(sort) = self.sort.backend_param() {
            params.push(("sort", sort.to_string()));
        }
        params
    }
}

impl BackendClient {
    /// List products (cached).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>, ApiError> {
        let key = CacheKey::Products(query.clone());
        if let Some(CacheValue::Products(page)) = self.cached(&key).await {
            debug!("Cache hit for product listing");
            return Ok(page);
        }

        let path = "/products";
        let builder = self.request(Method::GET, path, None)?.query(&query.params());
        let page: Page<Product> = self.send_json(builder, path).await?;

        self.cache(key, CacheValue::Products(page.clone())).await;
        Ok(page)
    }

    /// Get a single product (cached).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown ids.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.cached(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("/products/{id}");
        let builder = self.request(Method::GET, &path, None)?;
        let product: Product = self.send_json(builder, &path).await?;

        self.cache(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Full-text product search. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn search_products(
        &self,
        q: &str,
        page: u32,
        size: u32,
    ) -> Result<Page<Product>, ApiError> {
        let path = "/products/search";
        let builder = self.request(Method::GET, path, None)?.query(&[
            ("q", q.to_string()),
            ("page", page.to_string()),
            ("size", size.to_string()),
        ]);
        self.send_json(builder, path).await
    }

    /// Products currently on promotion (cached).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn list_promotions(&self) -> Result<Vec<Product>, ApiError> {
        if let Some(CacheValue::Promotions(products)) = self.cached(&CacheKey::Promotions).await {
            return Ok(products);
        }

        let path = "/products/promotions";
        let builder = self.request(Method::GET, path, None)?;
        let products: Vec<Product> = self.send_json(builder, path).await?;

        self.cache(CacheKey::Promotions, CacheValue::Promotions(products.clone()))
            .await;
        Ok(products)
    }

    /// All catalog categories (cached).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) = self.cached(&CacheKey::Categories).await {
            return Ok(categories);
        }

        let path = "/categories";
        let builder = self.request(Method::GET, path, None)?;
        let categories: Vec<Category> = self.send_json(builder, path).await?;

        self.cache(CacheKey::Categories, CacheValue::Categories(categories.clone()))
            .await;
        Ok(categories)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parse_falls_back_to_relevance() {
        assert_eq!(ProductSort::parse("price_desc"), ProductSort::PriceDesc);
        assert_eq!(ProductSort::parse("bogus"), ProductSort::Relevance);
        assert_eq!(ProductSort::Newest.as_str(), "newest");
    }

    #[test]
    fn test_query_params() {
        let query = ProductQuery {
            page: 2,
            size: 12,
            category: Some(CategoryId::new(5)),
            sort: ProductSort::PriceAsc,
        };
        assert_eq!(
            query.params(),
            vec![
                ("page", "2".to_string()),
                ("size", "12".to_string()),
                ("category", "5".to_string()),
                ("sort", "price,asc".to_string()),
            ]
        );
        assert_eq!(ProductQuery::default().params().len(), 2);
    }
}
