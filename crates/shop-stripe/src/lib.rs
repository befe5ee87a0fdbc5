//! # shop-stripe
//!
//! Stripe payment strategy for handoff-cart.
//!
//! `StripeCheckoutStrategy` opens a Checkout Session per shop order and
//! verifies `Stripe-Signature` webhooks. It is registered on `standalone`
//! and `payment` deployments; the `main` site never holds Stripe keys.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_stripe::StripeCheckoutStrategy;
//! use shop_core::PaymentStrategySelector;
//!
//! let strategy = StripeCheckoutStrategy::from_env()?;
//! let payments = PaymentStrategySelector::new("stripe").with_strategy(Arc::new(strategy));
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! // In your webhook endpoint:
//! let event = strategy.verify_webhook(body, stripe_signature_header).await?;
//! if let Some(order_no) = event.completed_shop_order() {
//!     checkout_service.mark_paid(order_no).await?;
//! }
//! ```

pub mod checkout;
pub mod config;
pub mod webhook;

// Re-exports
pub use checkout::{stripe_unit_amount, StripeCheckoutStrategy};
pub use config::StripeConfig;
pub use webhook::{
    parse_event, sign_payload, verify_signature, REQUIRED_WEBHOOK_EVENTS, SIGNATURE_HEADER,
    SIGNATURE_TOLERANCE_SECS,
};
