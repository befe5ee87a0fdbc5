//! # Checkout Service
//!
//! Order creation, checkout and the main-site to payment-site hand-off.
//!
//! ```text
//! standalone:  checkout() ──────────────────────────────► provider checkout URL
//! main:        checkout() ──► {PAYMENT_SITE_URL}/pay?token=..&type=shop
//! payment:     process_handoff(token) ──────────────────► provider checkout URL
//! webhook:     handle_webhook() ──► mark_paid() ──► pending_shipment
//! ```

use crate::clock::{Clock, SystemClock};
use crate::error::{ShopError, ShopResult};
use crate::order::{
    CheckoutRequest, OrderItem, OrderRepository, ShopOrder, ShopOrderStatus, ShopUser,
    WebhookEvent,
};
use crate::product::ProductCatalog;
use crate::site::{shop_cancel_url, shop_success_url, SiteConfig, SiteMode};
use crate::strategy::{BoxedPaymentStrategy, PaymentStrategySelector};
use crate::token::PaymentTokenSigner;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Hand-off `type` for shop orders
pub const SHOP_HANDOFF_TYPE: &str = "shop";

/// One cart line as submitted by the buyer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: u32,
}

/// Where to send the buyer next
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRedirect {
    pub order_no: String,
    pub checkout_url: String,
    /// True when the URL points at the payment site rather than a provider
    pub handoff: bool,
}

/// Orchestrates orders, payment strategies and hand-off tokens
pub struct CheckoutService {
    site: SiteConfig,
    orders: Arc<dyn OrderRepository>,
    catalog: Arc<ProductCatalog>,
    payments: PaymentStrategySelector,
    signer: Arc<PaymentTokenSigner>,
    clock: Arc<dyn Clock>,
}

impl CheckoutService {
    pub fn new(
        site: SiteConfig,
        orders: Arc<dyn OrderRepository>,
        catalog: Arc<ProductCatalog>,
        signer: Arc<PaymentTokenSigner>,
    ) -> Self {
        Self {
            site,
            orders,
            catalog,
            payments: PaymentStrategySelector::default(),
            signer,
            clock: Arc::new(SystemClock),
        }
    }

    /// Builder: set payment providers
    pub fn with_payments(mut self, payments: PaymentStrategySelector) -> Self {
        self.payments = payments;
        self
    }

    /// Builder: inject a clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    pub fn payments(&self) -> &PaymentStrategySelector {
        &self.payments
    }

    /// Create a `pending_payment` order priced from the catalog.
    ///
    /// Every product must be priced in the order currency; with no currency
    /// given, the first product's currency is used.
    #[instrument(skip(self, lines), fields(user_id = %user.id))]
    pub async fn create_order(
        &self,
        user: &ShopUser,
        lines: &[CartLine],
        currency: Option<&str>,
    ) -> ShopResult<ShopOrder> {
        let mut items = Vec::with_capacity(lines.len());
        let mut order_currency = currency.map(str::to_ascii_uppercase);

        for line in lines {
            let product = self.catalog.purchasable(&line.product_id)?;
            let currency = order_currency.get_or_insert_with(|| product.currency.clone());
            if !product.currency.eq_ignore_ascii_case(currency) {
                return Err(ShopError::InvalidRequest(format!(
                    "product {} is priced in {}, not {}",
                    product.id, product.currency, currency
                )));
            }
            items.push(OrderItem {
                product_id: product.id.clone(),
                name: product.name.clone(),
                unit_price: product.price,
                quantity: line.quantity,
            });
        }

        let currency = order_currency.unwrap_or_else(|| crate::currency::DEFAULT_CURRENCY.to_string());
        let order = ShopOrder::new(user, items, &currency, self.clock.now())?;
        let order = self.orders.create(order).await?;

        info!(
            order_no = %order.order_no,
            total = order.total_amount,
            currency = %order.currency,
            "created shop order"
        );
        Ok(order)
    }

    /// Order visible to `user`
    pub async fn get_order(&self, order_no: &str, user: &ShopUser) -> ShopResult<ShopOrder> {
        self.orders
            .find_by_order_no(order_no)
            .await?
            .filter(|o| o.is_owned_by(&user.id))
            .ok_or(ShopError::OrderNotFound)
    }

    /// Start paying for an order.
    ///
    /// On the main site this returns the hand-off URL; elsewhere it opens a
    /// provider checkout and returns its URL.
    #[instrument(skip(self), fields(user_id = %user.id, mode = %self.site.mode))]
    pub async fn checkout(
        &self,
        order_no: &str,
        user: &ShopUser,
        locale: Option<&str>,
    ) -> ShopResult<CheckoutRedirect> {
        let order = self.get_order(order_no, user).await?;
        order.ensure_pending_payment()?;

        if self.site.mode == SiteMode::Main {
            let token = self.signer.generate(&order.id, &order.order_no)?;
            let url = self.site.handoff_url(&token)?;
            info!(order_no = %order.order_no, "handing off to payment site");
            return Ok(CheckoutRedirect {
                order_no: order.order_no,
                checkout_url: url,
                handoff: true,
            });
        }

        let base = self.site.localized_base_url(locale);
        let request = CheckoutRequest::for_order(
            &order,
            &self.site.app_name,
            shop_success_url(&base, &order.order_no),
            shop_cancel_url(&base, &order.order_no),
        );
        self.start_payment(order, request).await
    }

    /// Redeem a hand-off token on the payment site
    #[instrument(skip(self, token))]
    pub async fn process_handoff(&self, token: &str, kind: &str) -> ShopResult<CheckoutRedirect> {
        self.site.require_mode(SiteMode::Payment)?;

        let payload = self.signer.verify(token).ok_or(ShopError::InvalidToken)?;

        if kind != SHOP_HANDOFF_TYPE {
            return Err(ShopError::InvalidRequest(format!(
                "unsupported order type: {}",
                kind
            )));
        }

        let order = self
            .orders
            .find_by_id(&payload.order_id)
            .await?
            .ok_or(ShopError::OrderNotFound)?;
        if order.order_no != payload.order_no {
            warn!(
                order_id = %order.id,
                token_order_no = %payload.order_no,
                "hand-off order number mismatch"
            );
            return Err(ShopError::OrderMismatch);
        }
        order.ensure_pending_payment()?;

        let base = self.site.main_site_url();
        let request = CheckoutRequest::for_order(
            &order,
            &self.site.app_name,
            shop_success_url(base, &order.order_no),
            shop_cancel_url(base, &order.order_no),
        );
        self.start_payment(order, request).await
    }

    /// Move a paid order to `pending_shipment`. Orders past
    /// `pending_payment` are returned unchanged.
    #[instrument(skip(self))]
    pub async fn mark_paid(&self, order_no: &str) -> ShopResult<ShopOrder> {
        let mut order = self
            .orders
            .find_by_order_no(order_no)
            .await?
            .ok_or(ShopError::OrderNotFound)?;

        if order.status != ShopOrderStatus::PendingPayment {
            info!(status = %order.status, "payment notification for settled order ignored");
            return Ok(order);
        }

        order.status = ShopOrderStatus::PendingShipment;
        order.paid_at = Some(self.clock.now());
        self.orders.update(&order).await?;

        info!(order_no = %order.order_no, "shop order paid");
        Ok(order)
    }

    /// Verify a provider webhook and apply it
    #[instrument(skip(self, payload, signature))]
    pub async fn handle_webhook(
        &self,
        provider: &str,
        payload: &[u8],
        signature: &str,
    ) -> ShopResult<WebhookEvent> {
        let strategy = self.payments.get(provider).ok_or_else(|| {
            ShopError::InvalidRequest(format!("unknown payment provider: {}", provider))
        })?;

        let event = strategy.verify_webhook(payload, signature).await?;
        if let Some(order_no) = event.completed_shop_order() {
            self.mark_paid(order_no).await?;
        }
        Ok(event)
    }

    fn strategy(&self) -> ShopResult<&BoxedPaymentStrategy> {
        if !self.site.mode.holds_payment_credentials() {
            return Err(ShopError::Configuration(format!(
                "site mode {} does not take payments",
                self.site.mode
            )));
        }
        self.payments.default_strategy().ok_or_else(|| {
            ShopError::Configuration("no payment provider configured".to_string())
        })
    }

    async fn start_payment(
        &self,
        mut order: ShopOrder,
        request: CheckoutRequest,
    ) -> ShopResult<CheckoutRedirect> {
        let strategy = self.strategy()?;
        let session = strategy.create_checkout(&request).await?;

        order.payment_order_id = Some(session.session_id.clone());
        order.payment_provider = Some(strategy.provider_name().to_string());
        self.orders.update(&order).await?;

        info!(
            order_no = %order.order_no,
            provider = strategy.provider_name(),
            session_id = %session.session_id,
            "checkout session created"
        );
        Ok(CheckoutRedirect {
            order_no: order.order_no,
            checkout_url: session.checkout_url,
            handoff: false,
        })
    }
}
