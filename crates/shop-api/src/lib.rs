//! # shop-api
//!
//! HTTP API layer for handoff-cart.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for the catalog, orders and checkout
//! - The payment-site hand-off and provider webhooks
//! - Exchange-rate and price-formatting endpoints
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/products` | List products with display prices |
//! | GET | `/api/products/{id}` | Get product |
//! | POST | `/api/shop/order` | Create order |
//! | GET | `/api/shop/order/{order_no}` | Order details |
//! | POST | `/api/shop/checkout` | Checkout or hand-off URL |
//! | POST | `/api/payment/process` | Redeem hand-off token |
//! | POST | `/api/payment/notify/{provider}` | Provider webhook |
//! | GET | `/api/currency/rates` | Rate table |
//! | POST | `/api/currency/rates/refresh` | Refresh rates |
//! | GET | `/api/currency/format` | Format a price |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
