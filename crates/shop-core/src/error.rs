//! # Shop Error Types
//!
//! Typed error handling for handoff-cart.
//! All fallible operations return `Result<T, ShopError>`.

use thiserror::Error;

/// Core error type for shop operations
#[derive(Debug, Error)]
pub enum ShopError {
    /// Configuration errors (missing secrets, invalid site mode)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Product not found in catalog
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// Order missing, or not visible to the caller
    #[error("Order not found")]
    OrderNotFound,

    /// Order number in a hand-off token does not match the stored order
    #[error("Order mismatch")]
    OrderMismatch,

    /// Order is not in a state that allows the operation
    #[error("Order status is {status}, cannot process")]
    InvalidOrderState { status: String },

    /// Hand-off token failed verification (reason is only logged)
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Endpoint called on a site deployment that does not serve it
    #[error("This endpoint is only available on the {expected} site")]
    WrongSiteMode { expected: String },

    /// Currency not supported
    #[error("Unsupported currency: {currency}")]
    UnsupportedCurrency { currency: String },

    /// No usable exchange rate for a conversion
    #[error("Rate not available for {from} -> {to}")]
    RateNotAvailable { from: String, to: String },

    /// Exchange rate provider could not be reached or answered badly
    #[error("Rate source unavailable: {0}")]
    RateSourceUnavailable(String),

    /// Persistent cache read/write failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with a provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// Checkout session creation failed
    #[error("Checkout creation failed: {0}")]
    CheckoutCreationFailed(String),

    /// Rate limited by provider
    #[error("Rate limited by {provider}, retry after {retry_after_secs} seconds")]
    RateLimited {
        provider: String,
        retry_after_secs: u64,
    },

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ShopError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShopError::NetworkError(_)
                | ShopError::RateLimited { .. }
                | ShopError::ProviderError { .. }
                | ShopError::RateSourceUnavailable(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::Configuration(_) => 500,
            ShopError::InvalidRequest(_) => 400,
            ShopError::ProductNotFound { .. } => 404,
            ShopError::OrderNotFound => 404,
            ShopError::OrderMismatch => 400,
            ShopError::InvalidOrderState { .. } => 409,
            ShopError::InvalidToken => 401,
            ShopError::WrongSiteMode { .. } => 404,
            ShopError::UnsupportedCurrency { .. } => 400,
            ShopError::RateNotAvailable { .. } => 422,
            ShopError::RateSourceUnavailable(_) => 503,
            ShopError::Storage(_) => 500,
            ShopError::ProviderError { .. } => 502,
            ShopError::NetworkError(_) => 503,
            ShopError::WebhookVerificationFailed(_) => 401,
            ShopError::WebhookParseError(_) => 400,
            ShopError::CheckoutCreationFailed(_) => 500,
            ShopError::RateLimited { .. } => 429,
            ShopError::Internal(_) => 500,
            ShopError::Serialization(_) => 500,
        }
    }
}

impl From<serde_json::Error> for ShopError {
    fn from(err: serde_json::Error) -> Self {
        ShopError::Serialization(err.to_string())
    }
}

/// Result type alias for shop operations
pub type ShopResult<T> = Result<T, ShopError>;
