//! # Payment Strategy Trait
//!
//! Each payment provider implements `PaymentStrategy`; the checkout
//! service only sees the trait, so a deployment picks its provider from
//! configuration.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │        PaymentStrategy (trait)           │
//! │  ├── create_checkout()                   │
//! │  ├── verify_webhook()                    │
//! │  └── provider_name()                     │
//! └──────────────────────────────────────────┘
//!                     ▲
//!                     │
//!          ┌──────────┴──────────┐
//!          │ StripeCheckout      │
//!          │   Strategy          │
//!          └─────────────────────┘
//! ```

use crate::error::ShopResult;
use crate::order::{CheckoutRequest, CheckoutSession, WebhookEvent};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Core trait for payment provider implementations.
#[async_trait]
pub trait PaymentStrategy: Send + Sync {
    /// Open a hosted checkout for one order.
    ///
    /// Returns a `CheckoutSession` whose `checkout_url` the buyer is sent to.
    async fn create_checkout(&self, request: &CheckoutRequest) -> ShopResult<CheckoutSession>;

    /// Verify a webhook signature and parse the event.
    ///
    /// # Arguments
    /// * `payload` - Raw webhook body bytes
    /// * `signature` - Signature header from the request
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> ShopResult<WebhookEvent>;

    /// Provider name (for logging and routing)
    fn provider_name(&self) -> &'static str;

    /// Header carrying the webhook signature
    fn signature_header(&self) -> &'static str {
        "signature"
    }
}

/// Type alias for a shared payment strategy (dynamic dispatch)
pub type BoxedPaymentStrategy = Arc<dyn PaymentStrategy>;

/// Strategy selector for multiple providers
#[derive(Clone)]
pub struct PaymentStrategySelector {
    strategies: HashMap<String, BoxedPaymentStrategy>,
    default_provider: String,
}

impl PaymentStrategySelector {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            strategies: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    pub fn register(&mut self, strategy: BoxedPaymentStrategy) {
        let name = strategy.provider_name().to_string();
        self.strategies.insert(name, strategy);
    }

    /// Register with builder pattern
    pub fn with_strategy(mut self, strategy: BoxedPaymentStrategy) -> Self {
        self.register(strategy);
        self
    }

    pub fn default_strategy(&self) -> Option<&BoxedPaymentStrategy> {
        self.strategies.get(&self.default_provider)
    }

    pub fn get(&self, provider: &str) -> Option<&BoxedPaymentStrategy> {
        self.strategies.get(provider)
    }

    /// Get strategy or fall back to default
    pub fn get_or_default(&self, provider: Option<&str>) -> Option<&BoxedPaymentStrategy> {
        match provider {
            Some(p) => self.get(p).or_else(|| self.default_strategy()),
            None => self.default_strategy(),
        }
    }

    pub fn providers(&self) -> Vec<&str> {
        self.strategies.keys().map(|s| s.as_str()).collect()
    }

    pub fn has_provider(&self, provider: &str) -> bool {
        self.strategies.contains_key(provider)
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for PaymentStrategySelector {
    fn default() -> Self {
        Self::new("stripe")
    }
}
