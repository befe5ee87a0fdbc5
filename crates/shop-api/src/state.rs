//! # Application State
//!
//! Shared state for the Axum application: the checkout service (orders,
//! payment strategies, hand-off tokens), the exchange-rate cache and
//! server configuration.

use shop_core::{
    CheckoutService, InMemoryOrderRepository, MissingRatePolicy, PaymentStrategySelector,
    ProductCatalog, RateService, SiteConfig, TokenConfig,
};
use shop_fx::RateApiConfig;
use shop_stripe::StripeCheckoutStrategy;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            log_format: match std::env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            environment: "development".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub checkout: Arc<CheckoutService>,
    pub rates: Arc<RateService>,
    /// What price display does when a rate is missing
    pub missing_rate: MissingRatePolicy,
}

impl AppState {
    pub fn new(config: AppConfig, checkout: CheckoutService, rates: RateService) -> Self {
        Self {
            config,
            checkout: Arc::new(checkout),
            rates: Arc::new(rates),
            missing_rate: MissingRatePolicy::default(),
        }
    }

    /// Builder: set missing-rate policy
    pub fn with_missing_rate(mut self, policy: MissingRatePolicy) -> Self {
        self.missing_rate = policy;
        self
    }

    /// Wire everything from environment variables
    pub fn from_env(config: AppConfig) -> anyhow::Result<Self> {
        let site = SiteConfig::from_env()?;
        let catalog = load_product_catalog()?;

        let signer = TokenConfig::from_env().into_signer();
        if !signer.is_configured() && site.mode != shop_core::SiteMode::Standalone {
            warn!("PAYMENT_TOKEN_SECRET is not set; hand-offs will fail");
        }

        let mut payments = PaymentStrategySelector::new("stripe");
        if site.mode.holds_payment_credentials() {
            let stripe = StripeCheckoutStrategy::from_env()
                .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;
            payments.register(Arc::new(stripe));
        }

        let rate_config = RateApiConfig::from_env()?;
        let missing_rate = rate_config.missing_rate;
        info!(config = ?rate_config, "exchange rate source");
        let rates = shop_fx::rate_service(rate_config)?;

        info!(mode = %site.mode, app_url = %site.app_url, "site configuration");

        let checkout = CheckoutService::new(
            site,
            Arc::new(InMemoryOrderRepository::new()),
            Arc::new(catalog),
            Arc::new(signer),
        )
        .with_payments(payments);

        Ok(Self::new(config, checkout, rates).with_missing_rate(missing_rate))
    }

    pub fn catalog(&self) -> &ProductCatalog {
        self.checkout.catalog()
    }

    pub fn site(&self) -> &SiteConfig {
        self.checkout.site()
    }
}

/// Load product catalog from config file
fn load_product_catalog() -> anyhow::Result<ProductCatalog> {
    let config_paths = [
        "config/products.toml",
        "../config/products.toml",
        "../../config/products.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog = ProductCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            info!("Loaded {} products from {}", catalog.len(), path);
            return Ok(catalog);
        }
    }

    warn!("No product catalog found, using empty catalog");
    Ok(ProductCatalog::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            ..AppConfig::default()
        };

        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_invalid_socket_addr() {
        let config = AppConfig {
            host: "not a host".to_string(),
            ..AppConfig::default()
        };
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn test_shipped_catalog_parses() {
        let raw = include_str!("../../../config/products.toml");
        let catalog = ProductCatalog::from_toml(raw).unwrap();
        assert!(!catalog.is_empty());
    }
}
