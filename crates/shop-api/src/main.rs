//! # handoff-cart
//!
//! Storefront API with a signed main-site to payment-site checkout hand-off.
//!
//! ## Usage
//!
//! ```bash
//! # Main site (no payment keys)
//! export SITE_MODE=main
//! export PAYMENT_SITE_URL=https://pay.example.com
//! export PAYMENT_TOKEN_SECRET=...
//!
//! # Payment site
//! export SITE_MODE=payment
//! export MAIN_SITE_URL=https://shop.example.com
//! export PAYMENT_TOKEN_SECRET=...
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_PUBLISHABLE_KEY=pk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//!
//! handoff-cart
//! ```

use shop_api::state::{AppConfig, AppState, LogFormat};
use shop_api::routes;
use shop_stripe::REQUIRED_WEBHOOK_EVENTS;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();

    let json = config.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with((!json).then(|| fmt::layer()))
        .with(json.then(|| fmt::layer().json()))
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::from_env(config)?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Site mode: {}", state.site().mode);
    info!("Products loaded: {}", state.catalog().len());
    info!(
        "Payment providers: {:?}",
        state.checkout.payments().providers()
    );

    let mode = state.site().mode;
    let app = routes::create_router(state);

    info!("handoff-cart starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Checkout: POST http://{}/api/shop/checkout", addr);
        if mode.holds_payment_credentials() {
            info!("Webhook: POST http://{}/api/payment/notify/stripe", addr);
            info!("Subscribe the webhook to: {}", REQUIRED_WEBHOOK_EVENTS.join(", "));
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  handoff-cart
  ━━━━━━━━━━━━━━━━━━━━━━━
  Storefront + payment hand-off
  Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
