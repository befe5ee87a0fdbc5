//! # shop-core
//!
//! Core types and traits for the handoff-cart storefront.
//!
//! This crate provides:
//! - `PaymentTokenSigner` for the signed main-site to payment-site hand-off
//! - `ExchangeRates`, `RateService` and `PriceFormatter` for multi-currency display
//! - `ShopOrder`, `OrderRepository` and `CheckoutService` for the checkout flow
//! - `PaymentStrategy` trait for implementing payment providers
//! - `SiteConfig` for the standalone / main / payment deployment split
//! - `ShopError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{PaymentTokenSigner, PriceFormatter};
//!
//! // Main site: sign a hand-off for the payment site
//! let signer = PaymentTokenSigner::new(Some(secret));
//! let token = signer.generate(&order.id, &order.order_no)?;
//!
//! // Payment site: redeem it
//! let payload = signer.verify(&token).ok_or(ShopError::InvalidToken)?;
//!
//! // Show a USD price to a German shopper
//! let rates = rate_service.exchange_rates().await;
//! let label = PriceFormatter::for_locale("de").with_rates(rates).format(1999, "USD");
//! ```

pub mod checkout;
pub mod clock;
pub mod currency;
pub mod error;
pub mod fx;
pub mod order;
pub mod price;
pub mod product;
pub mod rates;
pub mod signing;
pub mod site;
pub mod strategy;
pub mod token;

// Re-exports for convenience
pub use checkout::{CartLine, CheckoutRedirect, CheckoutService, SHOP_HANDOFF_TYPE};
pub use clock::{Clock, ManualClock, SystemClock};
pub use currency::{
    currency_decimals, currency_for_locale, currency_info, intl_locale, is_supported,
    CurrencyInfo, BASE_CURRENCY, CURRENCIES, DEFAULT_CURRENCY,
};
pub use error::{ShopError, ShopResult};
pub use fx::{OfflineRateSource, RateService, RateSource, RateStore};
pub use order::{
    CheckoutRequest, CheckoutSession, CheckoutStatus, InMemoryOrderRepository, OrderItem,
    OrderRepository, ShopOrder, ShopOrderStatus, ShopUser, WebhookEvent, WebhookEventType,
    SHOP_ORDER_TYPE,
};
pub use price::{
    calculate_discount, cents_to_unit, format_converted_price, format_discount_badge,
    format_price, format_price_range, unit_to_cents, PriceFormatter,
};
pub use product::{Product, ProductCatalog};
pub use rates::{
    convert_price, convert_with_policy, rates_ttl, try_convert_price, ExchangeRates,
    MissingRatePolicy, RATES_TTL_SECS,
};
pub use site::{SiteConfig, SiteMode};
pub use strategy::{BoxedPaymentStrategy, PaymentStrategy, PaymentStrategySelector};
pub use token::{
    PaymentTokenPayload, PaymentTokenSigner, ReplayPolicy, TokenConfig, TOKEN_TTL_MINUTES,
};
