//! # Rate API Client
//!
//! `RateSource` backed by exchangerate-api.com (keyed) or open.er-api.com
//! (keyless). Both answer with the same shape; the keyed API names the
//! table `conversion_rates`, the open one `rates`.

use crate::config::RateApiConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shop_core::{Clock, ExchangeRates, RateSource, ShopError, ShopResult, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// HTTP exchange-rate source
pub struct HttpRateSource {
    config: RateApiConfig,
    client: Client,
    clock: Arc<dyn Clock>,
}

impl HttpRateSource {
    pub fn new(config: RateApiConfig) -> ShopResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ShopError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            clock: Arc::new(SystemClock),
        })
    }

    /// Builder: inject a clock for `updatedAt` stamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &RateApiConfig {
        &self.config
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    #[instrument(skip(self))]
    async fn fetch_latest(&self, base: &str) -> ShopResult<ExchangeRates> {
        let url = self.config.latest_url(base);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ShopError::RateSourceUnavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ShopError::RateSourceUnavailable(e.to_string()))?;

        if !status.is_success() {
            error!("Rate API error: status={}", status);
            return Err(ShopError::RateSourceUnavailable(format!("HTTP {}", status)));
        }

        let parsed: RateApiResponse = serde_json::from_str(&body).map_err(|e| {
            ShopError::RateSourceUnavailable(format!("Failed to parse rate response: {}", e))
        })?;

        let accepted = parsed.result.as_deref() == Some("success") || parsed.rates.is_some();
        if !accepted {
            let reason = parsed
                .error_type
                .unwrap_or_else(|| parsed.result.unwrap_or_else(|| "unknown".to_string()));
            return Err(ShopError::RateSourceUnavailable(format!(
                "rate API rejected request: {}",
                reason
            )));
        }

        let rates = parsed
            .conversion_rates
            .or(parsed.rates)
            .ok_or_else(|| {
                ShopError::RateSourceUnavailable("rate response carried no rates".to_string())
            })?;

        debug!(currencies = rates.len(), "parsed rate table");

        Ok(ExchangeRates::new(
            parsed.base_code.unwrap_or_else(|| base.to_string()),
            rates,
            self.clock.now(),
        ))
    }

    fn source_name(&self) -> &'static str {
        if self.config.api_key.is_some() {
            "exchangerate-api"
        } else {
            "open-er-api"
        }
    }
}

// =============================================================================
// Rate API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct RateApiResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    base_code: Option<String>,
    #[serde(default)]
    conversion_rates: Option<HashMap<String, f64>>,
    #[serde(default)]
    rates: Option<HashMap<String, f64>>,
    #[serde(default, rename = "error-type")]
    error_type: Option<String>,
}
