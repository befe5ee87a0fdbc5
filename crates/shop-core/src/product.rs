//! # Product Catalog
//!
//! Products sold by the storefront.
//! Loaded from `config/products.toml`; prices are integer cents in the
//! product's own currency.

use crate::currency::DEFAULT_CURRENCY;
use crate::error::{ShopError, ShopResult};
use serde::{Deserialize, Serialize};

/// A product in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier (e.g., "desk-lamp")
    pub id: String,

    /// Display name
    pub name: String,

    /// Short description
    #[serde(default)]
    pub description: String,

    /// Price in cents
    pub price: i64,

    /// Currency the price is stored in
    #[serde(default = "default_currency")]
    pub currency: String,

    /// List price before discount, in cents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<i64>,

    /// Whether this product is available for purchase
    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            price,
            currency: default_currency(),
            original_price: None,
            active: true,
            image_url: None,
        }
    }

    /// Builder: set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Builder: set currency
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Builder: set list price
    pub fn with_original_price(mut self, cents: i64) -> Self {
        self.original_price = Some(cents);
        self
    }

    /// Builder: set image URL
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn is_discounted(&self) -> bool {
        self.original_price.is_some_and(|p| p > self.price)
    }
}

/// Product catalog (loaded from config)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    #[serde(default)]
    pub products: Vec<Product>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, product: Product) {
        self.products.push(product);
    }

    /// Builder: add a product
    pub fn with_product(mut self, product: Product) -> Self {
        self.add(product);
        self
    }

    /// Find a product by ID, active or not
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Find a product that can be bought
    pub fn purchasable(&self, id: &str) -> ShopResult<&Product> {
        self.get(id)
            .filter(|p| p.active)
            .ok_or_else(|| ShopError::ProductNotFound {
                product_id: id.to_string(),
            })
    }

    pub fn active_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.active)
    }

    /// Load catalog from TOML string
    pub fn from_toml(toml_str: &str) -> ShopResult<Self> {
        let catalog: Self = toml::from_str(toml_str)
            .map_err(|e| ShopError::Configuration(format!("invalid product catalog: {}", e)))?;

        if let Some(bad) = catalog.products.iter().find(|p| p.price < 0) {
            return Err(ShopError::Configuration(format!(
                "product {} has a negative price",
                bad.id
            )));
        }
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
[[products]]
id = "desk-lamp"
name = "Desk Lamp"
description = "Warm light"
price = 4999
original_price = 5999

[[products]]
id = "tea-set"
name = "Tea Set"
price = 350000
currency = "JPY"

[[products]]
id = "retired"
name = "Retired"
price = 100
active = false
"#;

    #[test]
    fn test_from_toml_defaults() {
        let catalog = ProductCatalog::from_toml(CATALOG).unwrap();
        assert_eq!(catalog.len(), 3);

        let lamp = catalog.get("desk-lamp").unwrap();
        assert_eq!(lamp.currency, "USD");
        assert!(lamp.active);
        assert!(lamp.is_discounted());

        assert_eq!(catalog.get("tea-set").unwrap().currency, "JPY");
    }

    #[test]
    fn test_active_filtering() {
        let catalog = ProductCatalog::from_toml(CATALOG).unwrap();
        let ids: Vec<_> = catalog.active_products().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["desk-lamp", "tea-set"]);

        assert!(catalog.get("retired").is_some());
        assert!(matches!(
            catalog.purchasable("retired"),
            Err(ShopError::ProductNotFound { .. })
        ));
    }

    #[test]
    fn test_negative_price_rejected() {
        let bad = "[[products]]\nid = \"x\"\nname = \"X\"\nprice = -1\n";
        assert!(matches!(
            ProductCatalog::from_toml(bad),
            Err(ShopError::Configuration(_))
        ));
    }

    #[test]
    fn test_builder() {
        let product = Product::new("mug", "Mug", 1299)
            .with_currency("EUR")
            .with_description("Ceramic");

        assert_eq!(product.currency, "EUR");
        assert_eq!(product.description, "Ceramic");
        assert!(!product.is_discounted());
    }
}
