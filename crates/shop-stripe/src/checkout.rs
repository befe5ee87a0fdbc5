//! # Stripe Checkout Sessions
//!
//! Implementation of the Stripe Checkout Sessions API.
//! Each shop order becomes one hosted-checkout session with a single line
//! item carrying the order total.

use crate::config::StripeConfig;
use crate::webhook::{parse_event, verify_signature, SIGNATURE_HEADER};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use shop_core::{
    cents_to_unit, currency_decimals, CheckoutRequest, CheckoutSession, Clock, PaymentStrategy,
    ShopError, ShopResult, SystemClock, WebhookEvent,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Stripe Checkout Session strategy
///
/// Uses Stripe's hosted checkout page; card data never touches this
/// service.
pub struct StripeCheckoutStrategy {
    config: StripeConfig,
    client: Client,
    clock: Arc<dyn Clock>,
}

impl StripeCheckoutStrategy {
    pub fn new(config: StripeConfig) -> ShopResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ShopError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            clock: Arc::new(SystemClock),
        })
    }

    /// Create from environment variables
    pub fn from_env() -> ShopResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    /// Builder: inject a clock for webhook timestamp checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }
}

/// Order cents in Stripe's minor unit: whole units for zero-decimal
/// currencies, cents otherwise
pub fn stripe_unit_amount(cents: i64, currency: &str) -> i64 {
    if currency_decimals(currency) == 0 {
        cents_to_unit(cents, currency) as i64
    } else {
        cents
    }
}

/// Form body for `POST /v1/checkout/sessions`
fn build_form_params(request: &CheckoutRequest) -> Vec<(String, String)> {
    let mut form_params: Vec<(String, String)> = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("client_reference_id".to_string(), request.order_no.clone()),
        (
            "line_items[0][price_data][currency]".to_string(),
            request.currency.to_ascii_lowercase(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            stripe_unit_amount(request.amount, &request.currency).to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            request.name.clone(),
        ),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
    ];

    if let Some(ref email) = request.customer_email {
        form_params.push(("customer_email".to_string(), email.clone()));
    }

    form_params.push(("metadata[order_id]".to_string(), request.order_id.clone()));
    let mut metadata: Vec<_> = request.metadata.iter().collect();
    metadata.sort();
    for (key, value) in metadata {
        form_params.push((format!("metadata[{}]", key), value.clone()));
    }

    form_params
}

#[async_trait]
impl PaymentStrategy for StripeCheckoutStrategy {
    #[instrument(skip(self, request), fields(order_no = %request.order_no))]
    async fn create_checkout(&self, request: &CheckoutRequest) -> ShopResult<CheckoutSession> {
        if request.amount <= 0 {
            return Err(ShopError::InvalidRequest(
                "Checkout amount must be positive".to_string(),
            ));
        }

        let form_params = build_form_params(request);
        debug!(
            "Creating Stripe checkout session: amount={} {}",
            request.amount, request.currency
        );

        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&form_params)
            .send()
            .await
            .map_err(|e| ShopError::NetworkError(e.to_string()))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let body = response
            .text()
            .await
            .map_err(|e| ShopError::NetworkError(e.to_string()))?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ShopError::RateLimited {
                provider: "stripe".to_string(),
                retry_after_secs: retry_after.unwrap_or(1),
            });
        }

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(ShopError::ProviderError {
                    provider: "stripe".to_string(),
                    message: error_response.error.message,
                });
            }

            return Err(ShopError::ProviderError {
                provider: "stripe".to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let session_response: StripeCheckoutSessionResponse = serde_json::from_str(&body)
            .map_err(|e| {
                ShopError::Serialization(format!("Failed to parse Stripe response: {}", e))
            })?;

        let checkout_url = session_response.url.ok_or_else(|| {
            ShopError::CheckoutCreationFailed("Stripe session has no redirect URL".to_string())
        })?;

        info!("Created Stripe checkout session: id={}", session_response.id);

        let mut session = CheckoutSession::new(
            session_response.id,
            &request.order_id,
            "stripe",
            checkout_url,
        );
        session.expires_at = session_response
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0));
        Ok(session)
    }

    #[instrument(skip(self, payload, signature))]
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> ShopResult<WebhookEvent> {
        verify_signature(&self.config.webhook_secret, payload, signature, self.clock.now())?;
        parse_event(payload)
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }

    fn signature_header(&self) -> &'static str {
        SIGNATURE_HEADER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeCheckoutSessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}
