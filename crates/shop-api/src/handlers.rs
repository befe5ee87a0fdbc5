//! # Request Handlers
//!
//! Axum request handlers for the storefront API.
//! Which checkout endpoints do anything useful depends on the site mode.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use shop_core::{
    currency_for_locale, CartLine, CheckoutRedirect, ExchangeRates, PriceFormatter, Product,
    ShopError, ShopOrder, ShopUser,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Header carrying the authenticated user ID
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the authenticated user's email
pub const USER_EMAIL_HEADER: &str = "x-user-email";

// =============================================================================
// Request/Response Types
// =============================================================================

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

pub type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

fn shop_error_to_response(err: ShopError) -> (StatusCode, Json<ErrorResponse>) {
    let code = err.status_code();
    if code >= 500 {
        error!("Request failed: {}", err);
    }
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

/// Display options for price endpoints
#[derive(Debug, Default, Deserialize)]
pub struct DisplayQuery {
    /// Display currency (defaults from locale)
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

/// Product with prices formatted for the shopper
#[derive(Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub display_price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_original_price: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub discount_badge: String,
}

impl ProductView {
    fn new(product: &Product, formatter: &PriceFormatter) -> Self {
        let original = product.original_price.filter(|_| product.is_discounted());
        Self {
            product: product.clone(),
            display_price: formatter.format(product.price, &product.currency),
            display_original_price: original.map(|cents| formatter.format(cents, &product.currency)),
            discount_badge: original
                .map(|cents| formatter.discount_badge(cents, product.price))
                .unwrap_or_default(),
        }
    }
}

/// Create order request
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<CartLine>,
    /// Order currency (defaults to the first product's currency)
    #[serde(default)]
    pub currency: Option<String>,
}

/// Checkout request
#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    pub order_no: String,
    /// Language prefix for success/cancel URLs
    #[serde(default)]
    pub locale: Option<String>,
}

/// Payment-site hand-off request
#[derive(Debug, Deserialize)]
pub struct ProcessPaymentBody {
    pub token: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Rate table with freshness flag
#[derive(Debug, Serialize)]
pub struct RatesResponse {
    #[serde(flatten)]
    pub rates: ExchangeRates,
    pub expired: bool,
}

/// Format a single amount
#[derive(Debug, Deserialize)]
pub struct FormatQuery {
    pub cents: i64,
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

// =============================================================================
// Helpers
// =============================================================================

/// Caller identity from the `x-user-id` / `x-user-email` headers
fn current_user(headers: &HeaderMap) -> ApiResult<ShopUser> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let id = header(USER_ID_HEADER).ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Authentication required", 401)),
        )
    })?;

    let user = ShopUser::new(id);
    Ok(match header(USER_EMAIL_HEADER) {
        Some(email) => user.with_email(email),
        None => user,
    })
}

async fn formatter(state: &AppState, query: &DisplayQuery) -> PriceFormatter {
    let locale = query
        .locale
        .clone()
        .unwrap_or_else(|| state.site().default_locale.clone());
    let base = match &query.currency {
        Some(currency) => PriceFormatter::new(currency.as_str(), locale),
        None => PriceFormatter::for_locale(locale),
    };
    base.with_rates(state.rates.exchange_rates().await)
        .with_policy(state.missing_rate)
}

fn rates_response(state: &AppState, rates: Arc<ExchangeRates>) -> RatesResponse {
    RatesResponse {
        expired: state.rates.is_expired(&rates),
        rates: rates.as_ref().clone(),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "handoff-cart",
        "mode": state.site().mode.as_str(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Active products with display prices
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<DisplayQuery>,
) -> impl IntoResponse {
    let formatter = formatter(&state, &query).await;
    let products: Vec<_> = state
        .catalog()
        .active_products()
        .map(|p| ProductView::new(p, &formatter))
        .collect();

    Json(serde_json::json!({
        "currency": formatter.currency(),
        "locale": formatter.locale(),
        "count": products.len(),
        "products": products,
    }))
}

/// Get single product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Query(query): Query<DisplayQuery>,
) -> ApiResult<Json<ProductView>> {
    let product = state
        .catalog()
        .purchasable(&product_id)
        .map_err(shop_error_to_response)?;
    let formatter = formatter(&state, &query).await;

    Ok(Json(ProductView::new(product, &formatter)))
}

/// Create a `pending_payment` order
#[instrument(skip(state, headers, request), fields(lines = request.items.len()))]
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<ShopOrder>)> {
    let user = current_user(&headers)?;
    let order = state
        .checkout
        .create_order(&user, &request.items, request.currency.as_deref())
        .await
        .map_err(shop_error_to_response)?;

    info!(order_no = %order.order_no, total = order.total_amount, "order created");
    Ok((StatusCode::CREATED, Json(order)))
}

/// Order details for its owner
pub async fn get_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_no): Path<String>,
) -> ApiResult<Json<ShopOrder>> {
    let user = current_user(&headers)?;
    let order = state
        .checkout
        .get_order(&order_no, &user)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(order))
}

/// Provider checkout URL, or the payment-site hand-off URL on `main`
#[instrument(skip(state, headers, body), fields(order_no = %body.order_no))]
pub async fn checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CheckoutBody>,
) -> ApiResult<Json<CheckoutRedirect>> {
    let user = current_user(&headers)?;
    let redirect = state
        .checkout
        .checkout(&body.order_no, &user, body.locale.as_deref())
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(redirect))
}

/// Redeem a hand-off token (payment site only)
#[instrument(skip(state, body), fields(kind = %body.kind))]
pub async fn process_payment(
    State(state): State<AppState>,
    Json(body): Json<ProcessPaymentBody>,
) -> ApiResult<Json<CheckoutRedirect>> {
    let redirect = state
        .checkout
        .process_handoff(&body.token, &body.kind)
        .await
        .map_err(|e| {
            warn!("Hand-off rejected: {}", e);
            shop_error_to_response(e)
        })?;
    Ok(Json(redirect))
}

/// Provider webhook.
///
/// The raw body is needed for signature verification, so it is taken as
/// `Bytes` rather than JSON.
#[instrument(skip(state, headers, body), fields(body_len = body.len()))]
pub async fn payment_notify(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let strategy = state.checkout.payments().get(&provider).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                format!("Unknown payment provider: {}", provider),
                404,
            )),
        )
    })?;

    let signature = headers
        .get(strategy.signature_header())
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            error!("Missing {} header", strategy.signature_header());
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Missing signature header", 400)),
            )
        })?;

    let event = state
        .checkout
        .handle_webhook(&provider, &body, signature)
        .await
        .map_err(|e| {
            error!("Webhook handling failed: {}", e);
            shop_error_to_response(e)
        })?;

    info!(
        "Received webhook: provider={} type={:?} id={}",
        provider, event.event_type, event.event_id
    );

    Ok(Json(serde_json::json!({ "received": true })))
}

/// Current rate table
pub async fn currency_rates(State(state): State<AppState>) -> impl IntoResponse {
    let rates = state.rates.exchange_rates().await;
    Json(rates_response(&state, rates))
}

/// Drop the cached table and fetch again
pub async fn refresh_rates(State(state): State<AppState>) -> impl IntoResponse {
    let rates = state.rates.refresh().await;
    info!(updated_at = %rates.updated_at_display(), "exchange rates refreshed");
    Json(rates_response(&state, rates))
}

/// Format one amount for display
pub async fn currency_format(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
) -> ApiResult<impl IntoResponse> {
    let from = query.from.to_ascii_uppercase();
    if !shop_core::is_supported(&from) {
        return Err(shop_error_to_response(ShopError::UnsupportedCurrency {
            currency: from,
        }));
    }

    let locale = query
        .locale
        .unwrap_or_else(|| state.site().default_locale.clone());
    let to = query
        .to
        .unwrap_or_else(|| currency_for_locale(&locale).to_string());

    let formatter = PriceFormatter::new(to, locale)
        .with_rates(state.rates.exchange_rates().await)
        .with_policy(state.missing_rate);

    Ok(Json(serde_json::json!({
        "cents": query.cents,
        "from": from,
        "to": formatter.currency(),
        "locale": formatter.locale(),
        "formatted": formatter.format(query.cents, &from),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new("Test error", 400).with_details("missing field");
        assert_eq!(err.error, "Test error");
        assert_eq!(err.code, 400);
        assert_eq!(err.details.as_deref(), Some("missing field"));
    }

    #[test]
    fn test_shop_error_conversion() {
        let (status, _json) = shop_error_to_response(ShopError::InvalidRequest("Bad data".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = shop_error_to_response(ShopError::InvalidToken);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json.0.error, "Invalid or expired token");
    }

    #[test]
    fn test_current_user() {
        let mut headers = HeaderMap::new();
        assert!(current_user(&headers).is_err());

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("u-1"));
        headers.insert(USER_EMAIL_HEADER, HeaderValue::from_static("a@example.com"));
        let user = current_user(&headers).unwrap();
        assert_eq!(user.id, "u-1");
        assert_eq!(user.email.as_deref(), Some("a@example.com"));

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("  "));
        assert!(current_user(&headers).is_err());
    }

    #[test]
    fn test_product_view_discount() {
        let product = Product::new("lamp", "Desk Lamp", 8_000).with_original_price(10_000);
        let formatter = PriceFormatter::new("USD", "en");
        let view = ProductView::new(&product, &formatter);

        assert_eq!(view.display_price, "$80.00");
        assert_eq!(view.display_original_price.as_deref(), Some("$100.00"));
        assert_eq!(view.discount_badge, "-20%");

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], "lamp");
        assert_eq!(json["price"], 8_000);
    }
}
