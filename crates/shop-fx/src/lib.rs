//! # shop-fx
//!
//! Exchange-rate adapters for handoff-cart.
//!
//! - `HttpRateSource` fetches rate tables from exchangerate-api.com, or
//!   open.er-api.com when no API key is configured
//! - `FileRateStore` persists the last table as `exchange_rates.json`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_fx::{rate_service, RateApiConfig};
//!
//! let service = rate_service(RateApiConfig::from_env()?)?;
//! let rates = service.exchange_rates().await;
//! ```

pub mod client;
pub mod config;
pub mod store;

// Re-exports
pub use client::HttpRateSource;
pub use config::{RateApiConfig, DEFAULT_KEYED_API_URL, DEFAULT_OPEN_API_URL};
pub use store::{FileRateStore, RATES_STORAGE_KEY};

use shop_core::{RateService, ShopResult};
use std::sync::Arc;

/// Rate service wired to the HTTP source and, when a cache directory is
/// configured, the file store
pub fn rate_service(config: RateApiConfig) -> ShopResult<RateService> {
    let cache_dir = config.cache_dir.clone();
    let mut service = RateService::new(Arc::new(HttpRateSource::new(config)?));
    if let Some(dir) = cache_dir {
        service = service.with_store(Arc::new(FileRateStore::new(dir)));
    }
    Ok(service)
}
