//! End-to-end tests for the storefront API, driven through the router with
//! an in-memory order store and a fake payment provider.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use shop_api::{create_router, AppConfig, AppState};
use shop_core::{
    CheckoutRequest, CheckoutService, CheckoutSession, InMemoryOrderRepository,
    OfflineRateSource, OrderRepository, PaymentStrategy, PaymentStrategySelector,
    PaymentTokenSigner, Product, ProductCatalog, RateService, ShopError, ShopOrderStatus,
    ShopResult, SiteConfig, SiteMode, WebhookEvent, WebhookEventType, SHOP_ORDER_TYPE,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

struct FakeProvider;

#[async_trait]
impl PaymentStrategy for FakeProvider {
    async fn create_checkout(&self, request: &CheckoutRequest) -> ShopResult<CheckoutSession> {
        Ok(CheckoutSession::new(
            format!("cs_{}", request.order_no),
            &request.order_id,
            "fake",
            format!("https://provider.test/{}", request.order_no),
        ))
    }

    /// Accepts signature "ok" and treats the body as the paid order number
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> ShopResult<WebhookEvent> {
        if signature != "ok" {
            return Err(ShopError::WebhookVerificationFailed("bad signature".into()));
        }
        Ok(WebhookEvent {
            event_id: "evt_1".into(),
            event_type: WebhookEventType::CheckoutCompleted,
            provider: "fake".into(),
            session_id: None,
            customer_email: None,
            amount_paid: None,
            currency: None,
            metadata: HashMap::from([
                ("order_type".to_string(), SHOP_ORDER_TYPE.to_string()),
                (
                    "order_no".to_string(),
                    String::from_utf8_lossy(payload).to_string(),
                ),
            ]),
            timestamp: Utc::now(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn signature_header(&self) -> &'static str {
        "fake-signature"
    }
}

fn catalog() -> Arc<ProductCatalog> {
    Arc::new(
        ProductCatalog::new()
            .with_product(Product::new("lamp", "Desk Lamp", 4999).with_original_price(6499))
            .with_product(Product::new("mug", "Mug", 1299))
            .with_product({
                let mut retired = Product::new("old", "Retired", 100);
                retired.active = false;
                retired
            }),
    )
}

fn app_with(
    site: SiteConfig,
    orders: Arc<InMemoryOrderRepository>,
    signer: Arc<PaymentTokenSigner>,
) -> Router {
    let payments = PaymentStrategySelector::new("fake").with_strategy(Arc::new(FakeProvider));
    let checkout = CheckoutService::new(site, orders, catalog(), signer).with_payments(payments);
    let rates = RateService::new(Arc::new(OfflineRateSource));
    create_router(AppState::new(AppConfig::default(), checkout, rates))
}

fn standalone_app() -> (Router, Arc<InMemoryOrderRepository>) {
    let orders = Arc::new(InMemoryOrderRepository::new());
    let app = app_with(
        SiteConfig::new(SiteMode::Standalone, "https://shop.test"),
        orders.clone(),
        Arc::new(PaymentTokenSigner::new(None)),
    );
    (app, orders)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn create_order(app: &Router, user: &str) -> String {
    let (status, body) = send(
        app,
        post_json(
            "/api/shop/order",
            Some(user),
            json!({ "items": [{ "product_id": "lamp", "quantity": 2 }] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["order_no"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_mode() {
    let (app, _) = standalone_app();
    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["mode"], "standalone");
}

#[tokio::test]
async fn products_show_converted_prices() {
    let (app, _) = standalone_app();
    let (status, body) = send(&app, get("/api/products?locale=de")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currency"], "EUR");
    assert_eq!(body["count"], 2);

    let lamp = &body["products"][0];
    assert_eq!(lamp["id"], "lamp");
    assert_eq!(lamp["price"], 4999);
    assert_eq!(lamp["display_price"], "45,99\u{a0}€");
    assert_eq!(lamp["discount_badge"], "-23%");

    let (status, _) = send(&app, get("/api/products/old")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn orders_are_private_to_their_owner() {
    let (app, _) = standalone_app();
    let order_no = create_order(&app, "alice").await;

    let uri = format!("/api/shop/order/{}", order_no);
    let mut request = get(&uri);
    request
        .headers_mut()
        .insert("x-user-id", "alice".parse().unwrap());
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_amount"], 9998);
    assert_eq!(body["status"], "pending_payment");

    let mut request = get(&uri);
    request.headers_mut().insert("x-user-id", "bob".parse().unwrap());
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_user_is_unauthorized() {
    let (app, _) = standalone_app();
    let (status, body) = send(
        &app,
        post_json("/api/shop/order", None, json!({ "items": [] })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);
}

#[tokio::test]
async fn standalone_checkout_goes_to_provider() {
    let (app, orders) = standalone_app();
    let order_no = create_order(&app, "alice").await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/shop/checkout",
            Some("alice"),
            json!({ "order_no": order_no }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["handoff"], false);
    assert_eq!(
        body["checkout_url"],
        format!("https://provider.test/{}", order_no)
    );

    let stored = orders.find_by_order_no(&order_no).await.unwrap().unwrap();
    assert_eq!(stored.payment_provider.as_deref(), Some("fake"));
}

#[tokio::test]
async fn main_site_hands_off_to_payment_site() {
    let orders = Arc::new(InMemoryOrderRepository::new());
    let signer = Arc::new(PaymentTokenSigner::new(Some("shared-secret".into())));

    let main = app_with(
        SiteConfig::new(SiteMode::Main, "https://shop.test")
            .with_payment_site_url("https://pay.test"),
        orders.clone(),
        signer.clone(),
    );
    let payment = app_with(
        SiteConfig::new(SiteMode::Payment, "https://pay.test")
            .with_main_site_url("https://shop.test"),
        orders.clone(),
        signer,
    );

    let order_no = create_order(&main, "alice").await;
    let (status, body) = send(
        &main,
        post_json(
            "/api/shop/checkout",
            Some("alice"),
            json!({ "order_no": order_no }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["handoff"], true);

    let url = body["checkout_url"].as_str().unwrap();
    assert!(url.starts_with("https://pay.test/pay?token="));
    assert!(url.ends_with("&type=shop"));
    let token = url
        .trim_start_matches("https://pay.test/pay?token=")
        .trim_end_matches("&type=shop");

    // The main site never redeems tokens
    let (status, _) = send(
        &main,
        post_json(
            "/api/payment/process",
            None,
            json!({ "token": token, "type": "shop" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &payment,
        post_json(
            "/api/payment/process",
            None,
            json!({ "token": token, "type": "shop" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order_no"], order_no);
    assert_eq!(body["handoff"], false);

    let (status, body) = send(
        &payment,
        post_json(
            "/api/payment/process",
            None,
            json!({ "token": format!("{}x", token), "type": "shop" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn webhook_marks_order_paid() {
    let (app, orders) = standalone_app();
    let order_no = create_order(&app, "alice").await;

    let unsigned = Request::builder()
        .method("POST")
        .uri("/api/payment/notify/fake")
        .body(Body::from(order_no.clone()))
        .unwrap();
    let (status, _) = send(&app, unsigned).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let signed = Request::builder()
        .method("POST")
        .uri("/api/payment/notify/fake")
        .header("fake-signature", "ok")
        .body(Body::from(order_no.clone()))
        .unwrap();
    let (status, body) = send(&app, signed).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);

    let stored = orders.find_by_order_no(&order_no).await.unwrap().unwrap();
    assert_eq!(stored.status, ShopOrderStatus::PendingShipment);
    assert!(stored.paid_at.is_some());

    let (status, _) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/payment/notify/paypal")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn currency_endpoints_use_fallback_rates() {
    let (app, _) = standalone_app();

    let (status, body) = send(&app, get("/api/currency/rates")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["base"], "USD");
    assert_eq!(body["rates"]["JPY"], 149.5);
    assert_eq!(body["expired"], false);

    let (status, body) = send(
        &app,
        get("/api/currency/format?cents=1000&from=USD&locale=ja"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["to"], "JPY");
    assert_eq!(body["formatted"], "¥1,495");

    let (status, _) = send(&app, get("/api/currency/format?cents=1&from=XXX")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let refresh = Request::builder()
        .method("POST")
        .uri("/api/currency/rates/refresh")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, refresh).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rates"]["EUR"], 0.92);
}

#[tokio::test]
async fn currency_format_handles_large_amounts() {
    let (app, _) = standalone_app();

    let (status, body) = send(
        &app,
        get("/api/currency/format?cents=1000000000000000&from=USD&to=VND&locale=en"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["formatted"], "₫245,000,000,000,000,000");

    let uri = format!("/api/currency/format?cents={}&from=JPY&to=JPY&locale=en", i64::MAX);
    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["formatted"], "¥92,233,720,368,547,758");
}
