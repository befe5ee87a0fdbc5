//! # Exchange Rate Cache
//!
//! `RateService` answers "what are the current rates" without ever failing.
//! Lookup order:
//!
//! ```text
//! memory (fresh since loaded) -> persistent store (fresh since updatedAt)
//!     -> remote source -> hardcoded fallback
//! ```
//!
//! The service owns its cache; nothing here is global. Callers racing on a
//! cold cache may each hit the source once, which is accepted.

use crate::clock::{Clock, SystemClock};
use crate::currency::BASE_CURRENCY;
use crate::error::ShopResult;
use crate::rates::{rates_ttl, ExchangeRates};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Remote provider of rate tables
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Fetch the latest table against `base`
    async fn fetch_latest(&self, base: &str) -> ShopResult<ExchangeRates>;

    /// Provider name for logs
    fn source_name(&self) -> &'static str;
}

/// Persistent cache for a rate table, surviving process restarts.
///
/// Called from request handlers, so implementations must not block the
/// runtime.
#[async_trait]
pub trait RateStore: Send + Sync {
    async fn load(&self) -> ShopResult<Option<ExchangeRates>>;
    async fn save(&self, rates: &ExchangeRates) -> ShopResult<()>;
    async fn clear(&self) -> ShopResult<()>;
}

/// A source that always fails; leaves the service on cache and fallback
pub struct OfflineRateSource;

#[async_trait]
impl RateSource for OfflineRateSource {
    async fn fetch_latest(&self, _base: &str) -> ShopResult<ExchangeRates> {
        Err(crate::ShopError::RateSourceUnavailable(
            "offline".to_string(),
        ))
    }

    fn source_name(&self) -> &'static str {
        "offline"
    }
}

struct MemoryEntry {
    rates: Arc<ExchangeRates>,
    loaded_at: DateTime<Utc>,
}

/// Cached access to exchange rates
pub struct RateService {
    source: Arc<dyn RateSource>,
    store: Option<Arc<dyn RateStore>>,
    clock: Arc<dyn Clock>,
    base: String,
    ttl: Duration,
    memory: Mutex<Option<MemoryEntry>>,
}

impl RateService {
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        Self {
            source,
            store: None,
            clock: Arc::new(SystemClock),
            base: BASE_CURRENCY.to_string(),
            ttl: rates_ttl(),
            memory: Mutex::new(None),
        }
    }

    /// Builder: add a persistent store
    pub fn with_store(mut self, store: Arc<dyn RateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builder: inject a clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builder: override the freshness window
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Current rate table. Never fails.
    pub async fn exchange_rates(&self) -> Arc<ExchangeRates> {
        let now = self.clock.now();

        if let Some(rates) = self.memory_hit(now) {
            return rates;
        }

        if let Some(rates) = self.store_hit(now).await {
            debug!("exchange rates loaded from persistent cache");
            return self.remember(rates, now);
        }

        match self.source.fetch_latest(&self.base).await {
            Ok(rates) => {
                info!(
                    source = self.source.source_name(),
                    currencies = rates.rates.len(),
                    "fetched exchange rates"
                );
                if let Some(store) = &self.store {
                    if let Err(e) = store.save(&rates).await {
                        warn!("failed to persist exchange rates: {}", e);
                    }
                }
                self.remember(rates, now)
            }
            Err(e) => {
                warn!(
                    source = self.source.source_name(),
                    "failed to fetch exchange rates, using fallback table: {}", e
                );
                self.remember(ExchangeRates::fallback(now), now)
            }
        }
    }

    /// Rate for one currency: 1 for the base, 1 when unknown
    pub async fn exchange_rate(&self, currency: &str) -> f64 {
        if currency == self.base {
            return 1.0;
        }
        self.exchange_rates().await.rate_or_one(currency)
    }

    /// Drop both caches and load again
    pub async fn refresh(&self) -> Arc<ExchangeRates> {
        self.memory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(store) = &self.store {
            if let Err(e) = store.clear().await {
                warn!("failed to clear persistent exchange-rate cache: {}", e);
            }
        }
        self.exchange_rates().await
    }

    /// Whether a table is past the freshness window now
    pub fn is_expired(&self, rates: &ExchangeRates) -> bool {
        rates.is_expired(self.clock.now(), self.ttl)
    }

    fn memory_hit(&self, now: DateTime<Utc>) -> Option<Arc<ExchangeRates>> {
        let memory = self.memory.lock().unwrap_or_else(PoisonError::into_inner);
        memory
            .as_ref()
            .filter(|entry| now - entry.loaded_at < self.ttl)
            .map(|entry| entry.rates.clone())
    }

    async fn store_hit(&self, now: DateTime<Utc>) -> Option<ExchangeRates> {
        let store = self.store.as_ref()?;
        match store.load().await {
            Ok(Some(rates)) if !rates.is_expired(now, self.ttl) => Some(rates),
            Ok(Some(_)) => {
                if let Err(e) = store.clear().await {
                    warn!("failed to drop expired exchange-rate cache: {}", e);
                }
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("failed to read exchange-rate cache: {}", e);
                None
            }
        }
    }

    fn remember(&self, rates: ExchangeRates, now: DateTime<Utc>) -> Arc<ExchangeRates> {
        let rates = Arc::new(rates);
        *self.memory.lock().unwrap_or_else(PoisonError::into_inner) = Some(MemoryEntry {
            rates: rates.clone(),
            loaded_at: now,
        });
        rates
    }
}
