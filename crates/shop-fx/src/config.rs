//! # Rate API Configuration
//!
//! Exchange-rate settings, loaded from environment variables.

use shop_core::{MissingRatePolicy, ShopError, ShopResult};
use std::env;
use std::path::PathBuf;

/// Keyed API (exchangerate-api.com v6)
pub const DEFAULT_KEYED_API_URL: &str = "https://v6.exchangerate-api.com/v6";

/// Free API used when no key is configured
pub const DEFAULT_OPEN_API_URL: &str = "https://open.er-api.com/v6";

/// Exchange-rate source and cache configuration
#[derive(Clone)]
pub struct RateApiConfig {
    /// `EXCHANGE_RATE_API_KEY`; selects the keyed API when set
    pub api_key: Option<String>,

    /// `EXCHANGE_RATE_API_URL`; base of the keyed API
    pub api_url: String,

    /// Base of the keyless API
    pub open_api_url: String,

    /// `EXCHANGE_RATE_CACHE_DIR`; no persistent cache when unset
    pub cache_dir: Option<PathBuf>,

    /// `CURRENCY_MISSING_RATE`
    pub missing_rate: MissingRatePolicy,

    pub timeout_secs: u64,
}

impl RateApiConfig {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `EXCHANGE_RATE_API_KEY`
    /// - `EXCHANGE_RATE_API_URL`
    /// - `EXCHANGE_RATE_CACHE_DIR`
    /// - `CURRENCY_MISSING_RATE` (`degrade` or `fail_closed`)
    pub fn from_env() -> ShopResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ShopResult<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing_rate = match get("CURRENCY_MISSING_RATE") {
            Some(value) => value.parse()?,
            None => MissingRatePolicy::default(),
        };

        let api_url = get("EXCHANGE_RATE_API_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_KEYED_API_URL.to_string());

        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ShopError::Configuration(
                "EXCHANGE_RATE_API_URL must be an http(s) URL".to_string(),
            ));
        }

        Ok(Self {
            api_key: get("EXCHANGE_RATE_API_KEY"),
            api_url,
            open_api_url: DEFAULT_OPEN_API_URL.to_string(),
            cache_dir: get("EXCHANGE_RATE_CACHE_DIR").map(PathBuf::from),
            missing_rate,
            timeout_secs: 10,
        })
    }

    /// Builder: set keyed API base URL (for testing)
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Builder: set keyless API base URL (for testing)
    pub fn with_open_api_url(mut self, url: impl Into<String>) -> Self {
        self.open_api_url = url.into();
        self
    }

    /// Builder: set API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Latest-rates endpoint for `base`
    pub fn latest_url(&self, base: &str) -> String {
        match &self.api_key {
            Some(key) => format!("{}/{}/latest/{}", self.api_url, key, base),
            None => format!("{}/latest/{}", self.open_api_url, base),
        }
    }
}

impl Default for RateApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_KEYED_API_URL.to_string(),
            open_api_url: DEFAULT_OPEN_API_URL.to_string(),
            cache_dir: None,
            missing_rate: MissingRatePolicy::default(),
            timeout_secs: 10,
        }
    }
}

impl std::fmt::Debug for RateApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateApiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("api_url", &self.api_url)
            .field("open_api_url", &self.open_api_url)
            .field("cache_dir", &self.cache_dir)
            .field("missing_rate", &self.missing_rate)
            .finish()
    }
}
