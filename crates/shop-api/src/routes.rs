//! # Routes
//!
//! Axum router configuration for the storefront API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Catalog:
///   - GET  /api/products - Active products with display prices
///   - GET  /api/products/{id} - One product
///
/// - Orders (main / standalone):
///   - POST /api/shop/order - Create order
///   - GET  /api/shop/order/{order_no} - Order details
///   - POST /api/shop/checkout - Provider checkout or payment-site hand-off
///
/// - Payments (payment / standalone):
///   - POST /api/payment/process - Redeem hand-off token
///   - POST /api/payment/notify/{provider} - Provider webhook
///
/// - Currency:
///   - GET  /api/currency/rates - Current rate table
///   - POST /api/currency/rates/refresh - Force refresh
///   - GET  /api/currency/format - Format one amount
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let shop_routes = Router::new()
        .route("/order", post(handlers::create_order))
        .route("/order/{order_no}", get(handlers::get_order))
        .route("/checkout", post(handlers::checkout));

    let payment_routes = Router::new()
        .route("/process", post(handlers::process_payment))
        .route("/notify/{provider}", post(handlers::payment_notify));

    let currency_routes = Router::new()
        .route("/rates", get(handlers::currency_rates))
        .route("/rates/refresh", post(handlers::refresh_rates))
        .route("/format", get(handlers::currency_format));

    let api_routes = Router::new()
        .route("/products", get(handlers::list_products))
        .route("/products/{product_id}", get(handlers::get_product))
        .nest("/shop", shop_routes)
        .nest("/payment", payment_routes)
        .nest("/currency", currency_routes);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
