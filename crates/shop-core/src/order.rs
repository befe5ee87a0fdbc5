//! # Order Types
//!
//! Shop orders, the checkout request handed to a payment provider, and
//! the session and webhook types that come back.

use crate::currency::currency_info;
use crate::error::{ShopError, ShopResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// `order_type` metadata value marking a shop order at the provider
pub const SHOP_ORDER_TYPE: &str = "shop_order";

/// The signed-in buyer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopUser {
    pub id: String,
    pub email: Option<String>,
}

impl ShopUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }

    /// Builder: set email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Lifecycle of a shop order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopOrderStatus {
    #[default]
    PendingPayment,
    PendingShipment,
    Shipped,
    Delivered,
    Completed,
    Canceled,
    Refunded,
}

impl ShopOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShopOrderStatus::PendingPayment => "pending_payment",
            ShopOrderStatus::PendingShipment => "pending_shipment",
            ShopOrderStatus::Shipped => "shipped",
            ShopOrderStatus::Delivered => "delivered",
            ShopOrderStatus::Completed => "completed",
            ShopOrderStatus::Canceled => "canceled",
            ShopOrderStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for ShopOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line in a shop order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,

    /// Product name at time of purchase
    pub name: String,

    /// Unit price in cents
    pub unit_price: i64,

    pub quantity: u32,
}

impl OrderItem {
    /// Line total in cents; `None` if it does not fit in an `i64`
    pub fn total(&self) -> Option<i64> {
        self.unit_price.checked_mul(i64::from(self.quantity))
    }
}

/// A storefront order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopOrder {
    pub id: String,

    /// Human-facing order number, `SO{unix_ms}{XXXX}`
    pub order_no: String,

    pub user_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,

    pub status: ShopOrderStatus,

    pub items: Vec<OrderItem>,

    /// Sum of line totals, in cents
    pub total_amount: i64,

    pub currency: String,

    /// Provider checkout session ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_order_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_provider: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl ShopOrder {
    /// New `pending_payment` order. Rejects empty carts, zero quantities
    /// and unsupported currencies.
    pub fn new(
        user: &ShopUser,
        items: Vec<OrderItem>,
        currency: &str,
        now: DateTime<Utc>,
    ) -> ShopResult<Self> {
        if items.is_empty() {
            return Err(ShopError::InvalidRequest("order has no items".to_string()));
        }
        if let Some(item) = items.iter().find(|i| i.quantity == 0) {
            return Err(ShopError::InvalidRequest(format!(
                "quantity for {} must be positive",
                item.product_id
            )));
        }
        let currency = currency_info(currency)
            .map(|c| c.code.to_string())
            .ok_or_else(|| ShopError::UnsupportedCurrency {
                currency: currency.to_string(),
            })?;

        let total_amount = items
            .iter()
            .try_fold(0_i64, |sum, item| item.total()?.checked_add(sum))
            .ok_or_else(|| ShopError::InvalidRequest("order total is too large".to_string()))?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            order_no: generate_order_no(now.timestamp_millis()),
            user_id: user.id.clone(),
            user_email: user.email.clone(),
            status: ShopOrderStatus::PendingPayment,
            items,
            total_amount,
            currency,
            payment_order_id: None,
            payment_provider: None,
            paid_at: None,
            created_at: now,
        })
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Error unless the order is still awaiting payment
    pub fn ensure_pending_payment(&self) -> ShopResult<()> {
        if self.status == ShopOrderStatus::PendingPayment {
            Ok(())
        } else {
            Err(ShopError::InvalidOrderState {
                status: self.status.to_string(),
            })
        }
    }

    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }
}

/// `SO` + Unix milliseconds + 4 uppercase alphanumerics
pub fn generate_order_no(unix_millis: i64) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(4)
        .collect::<String>()
        .to_ascii_uppercase();
    format!("SO{}{}", unix_millis, suffix)
}

/// Order storage
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, order: ShopOrder) -> ShopResult<ShopOrder>;

    async fn find_by_id(&self, id: &str) -> ShopResult<Option<ShopOrder>>;

    async fn find_by_order_no(&self, order_no: &str) -> ShopResult<Option<ShopOrder>>;

    /// Replace a stored order; `OrderNotFound` if it was never created
    async fn update(&self, order: &ShopOrder) -> ShopResult<()>;
}

/// Process-local order store
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: DashMap<String, ShopOrder>,
    /// order_no -> id
    numbers: DashMap<String, String>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: ShopOrder) -> ShopResult<ShopOrder> {
        match self.numbers.entry(order.order_no.clone()) {
            Entry::Occupied(_) => Err(ShopError::Storage(format!(
                "duplicate order number {}",
                order.order_no
            ))),
            Entry::Vacant(slot) => {
                // Insert the order while the number slot is still locked
                self.orders.insert(order.id.clone(), order.clone());
                slot.insert(order.id.clone());
                Ok(order)
            }
        }
    }

    async fn find_by_id(&self, id: &str) -> ShopResult<Option<ShopOrder>> {
        Ok(self.orders.get(id).map(|o| o.clone()))
    }

    async fn find_by_order_no(&self, order_no: &str) -> ShopResult<Option<ShopOrder>> {
        let Some(id) = self.numbers.get(order_no).map(|id| id.clone()) else {
            return Ok(None);
        };
        self.find_by_id(&id).await
    }

    async fn update(&self, order: &ShopOrder) -> ShopResult<()> {
        match self.orders.get_mut(&order.id) {
            Some(mut stored) => {
                *stored = order.clone();
                Ok(())
            }
            None => Err(ShopError::OrderNotFound),
        }
    }
}

/// What a payment provider needs to open a hosted checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub order_id: String,

    pub order_no: String,

    /// Line item label shown on the provider page
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,

    /// Amount in cents
    pub amount: i64,

    pub currency: String,

    pub success_url: String,

    pub cancel_url: String,

    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Idempotency key (prevents duplicate sessions)
    pub idempotency_key: String,
}

impl CheckoutRequest {
    /// Request for a shop order with the standard metadata
    pub fn for_order(
        order: &ShopOrder,
        app_name: &str,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        let metadata = HashMap::from([
            ("app_name".to_string(), app_name.to_string()),
            ("order_no".to_string(), order.order_no.clone()),
            ("user_id".to_string(), order.user_id.clone()),
            ("order_type".to_string(), SHOP_ORDER_TYPE.to_string()),
        ]);

        Self {
            order_id: order.id.clone(),
            order_no: order.order_no.clone(),
            name: format!("Order #{}", order.order_no),
            customer_email: order.user_email.clone(),
            amount: order.total_amount,
            currency: order.currency.clone(),
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
            metadata,
            idempotency_key: Uuid::new_v4().to_string(),
        }
    }
}

/// Status of a checkout session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    #[default]
    Open,
    Complete,
    Expired,
}

/// A checkout session created by a payment provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID
    pub session_id: String,

    /// Our internal order ID
    pub order_id: String,

    /// Provider name (e.g., "stripe")
    pub provider: String,

    /// URL to redirect the buyer to
    pub checkout_url: String,

    #[serde(default)]
    pub status: CheckoutStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl CheckoutSession {
    pub fn new(
        session_id: impl Into<String>,
        order_id: impl Into<String>,
        provider: impl Into<String>,
        checkout_url: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            order_id: order_id.into(),
            provider: provider.into(),
            checkout_url: checkout_url.into(),
            status: CheckoutStatus::Open,
            expires_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Webhook event types we act on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    CheckoutCompleted,
    CheckoutExpired,
    PaymentFailed,
    /// Anything else, passed through by name
    Unknown(String),
}

/// A verified, parsed webhook event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event_id: String,

    pub event_type: WebhookEventType,

    pub provider: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,

    /// Amount paid in the provider's minor unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_paid: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// Metadata echoed back from the checkout request
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    pub timestamp: DateTime<Utc>,
}

impl WebhookEvent {
    /// Order number of a completed shop-order checkout, if this is one
    pub fn completed_shop_order(&self) -> Option<&str> {
        if self.event_type != WebhookEventType::CheckoutCompleted {
            return None;
        }
        if self.metadata.get("order_type").map(String::as_str) != Some(SHOP_ORDER_TYPE) {
            return None;
        }
        self.metadata.get("order_no").map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<OrderItem> {
        vec![
            OrderItem {
                product_id: "p1".into(),
                name: "Product 1".into(),
                unit_price: 1000,
                quantity: 2,
            },
            OrderItem {
                product_id: "p2".into(),
                name: "Product 2".into(),
                unit_price: 2500,
                quantity: 1,
            },
        ]
    }

    fn user() -> ShopUser {
        ShopUser::new("user-1").with_email("buyer@example.com")
    }

    #[test]
    fn test_order_total() {
        let order = ShopOrder::new(&user(), items(), "usd", Utc::now()).unwrap();

        assert_eq!(order.total_amount, 4500);
        assert_eq!(order.item_count(), 3);
        assert_eq!(order.currency, "USD");
        assert_eq!(order.status, ShopOrderStatus::PendingPayment);
        assert_eq!(order.user_email.as_deref(), Some("buyer@example.com"));
    }

    #[test]
    fn test_order_validation() {
        let now = Utc::now();
        assert!(matches!(
            ShopOrder::new(&user(), vec![], "USD", now),
            Err(ShopError::InvalidRequest(_))
        ));

        let mut zero = items();
        zero[0].quantity = 0;
        assert!(matches!(
            ShopOrder::new(&user(), zero, "USD", now),
            Err(ShopError::InvalidRequest(_))
        ));

        assert!(matches!(
            ShopOrder::new(&user(), items(), "BTC", now),
            Err(ShopError::UnsupportedCurrency { .. })
        ));
    }

    #[test]
    fn test_order_total_overflow() {
        let line = OrderItem {
            product_id: "yacht".into(),
            name: "Yacht".into(),
            unit_price: i64::MAX / 2,
            quantity: 3,
        };
        assert_eq!(line.total(), None);
        assert!(matches!(
            ShopOrder::new(&user(), vec![line], "USD", Utc::now()),
            Err(ShopError::InvalidRequest(_))
        ));

        // Each line fits, the sum does not
        let half = OrderItem {
            product_id: "half".into(),
            name: "Half".into(),
            unit_price: i64::MAX / 2 + 1,
            quantity: 1,
        };
        assert_eq!(half.total(), Some(i64::MAX / 2 + 1));
        assert!(matches!(
            ShopOrder::new(&user(), vec![half.clone(), half], "USD", Utc::now()),
            Err(ShopError::InvalidRequest(_))
        ));

        let many = OrderItem {
            product_id: "pin".into(),
            name: "Pin".into(),
            unit_price: 1,
            quantity: u32::MAX,
        };
        let order = ShopOrder::new(&user(), vec![many.clone(), many], "USD", Utc::now()).unwrap();
        assert_eq!(order.item_count(), 2 * u64::from(u32::MAX));
    }

    #[test]
    fn test_order_no_format() {
        let no = generate_order_no(1_700_000_000_123);
        assert!(no.starts_with("SO1700000000123"));
        assert_eq!(no.len(), 2 + 13 + 4);
        assert!(no[15..]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ShopOrderStatus::PendingShipment).unwrap();
        assert_eq!(json, "\"pending_shipment\"");
        assert_eq!(ShopOrderStatus::Canceled.to_string(), "canceled");
    }

    #[test]
    fn test_pending_payment_guard() {
        let mut order = ShopOrder::new(&user(), items(), "USD", Utc::now()).unwrap();
        assert!(order.ensure_pending_payment().is_ok());

        order.status = ShopOrderStatus::Shipped;
        assert!(matches!(
            order.ensure_pending_payment(),
            Err(ShopError::InvalidOrderState { status }) if status == "shipped"
        ));
    }

    #[test]
    fn test_checkout_request_metadata() {
        let order = ShopOrder::new(&user(), items(), "USD", Utc::now()).unwrap();
        let req = CheckoutRequest::for_order(&order, "Shop", "https://s", "https://c");

        assert_eq!(req.name, format!("Order #{}", order.order_no));
        assert_eq!(req.amount, 4500);
        assert_eq!(req.metadata["order_type"], "shop_order");
        assert_eq!(req.metadata["order_no"], order.order_no);
        assert_eq!(req.metadata["user_id"], "user-1");
        assert_eq!(req.metadata["app_name"], "Shop");
    }

    #[test]
    fn test_completed_shop_order() {
        let mut event = WebhookEvent {
            event_id: "evt_1".into(),
            event_type: WebhookEventType::CheckoutCompleted,
            provider: "stripe".into(),
            session_id: Some("cs_1".into()),
            customer_email: None,
            amount_paid: Some(4500),
            currency: Some("usd".into()),
            metadata: HashMap::from([
                ("order_type".to_string(), "shop_order".to_string()),
                ("order_no".to_string(), "SO1".to_string()),
            ]),
            timestamp: Utc::now(),
        };
        assert_eq!(event.completed_shop_order(), Some("SO1"));

        event.metadata.insert("order_type".into(), "subscription".into());
        assert_eq!(event.completed_shop_order(), None);
    }

    #[tokio::test]
    async fn test_in_memory_repository() {
        let repo = InMemoryOrderRepository::new();
        let order = ShopOrder::new(&user(), items(), "USD", Utc::now()).unwrap();
        let created = repo.create(order.clone()).await.unwrap();

        let by_no = repo.find_by_order_no(&created.order_no).await.unwrap().unwrap();
        assert_eq!(by_no.id, created.id);
        assert!(repo.find_by_id("missing").await.unwrap().is_none());

        let mut paid = by_no.clone();
        paid.status = ShopOrderStatus::PendingShipment;
        repo.update(&paid).await.unwrap();
        let stored = repo.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ShopOrderStatus::PendingShipment);

        assert!(repo.create(order).await.is_err());
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_create() {
        let repo = std::sync::Arc::new(InMemoryOrderRepository::new());
        let order = ShopOrder::new(&user(), items(), "USD", Utc::now()).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let repo = repo.clone();
                let mut order = order.clone();
                order.id = format!("order-{}", i);
                tokio::spawn(async move { repo.create(order).await.is_ok() })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_order() {
        let repo = InMemoryOrderRepository::new();
        let order = ShopOrder::new(&user(), items(), "USD", Utc::now()).unwrap();
        assert!(matches!(
            repo.update(&order).await,
            Err(ShopError::OrderNotFound)
        ));
    }
}
