//! # shop-wasm
//!
//! WebAssembly bindings for handoff-cart.
//!
//! Lets a storefront page format and convert prices exactly the way the
//! server does, using a rate table fetched from `/api/currency/rates`.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { format_converted_price, currency_for_locale } from 'shop-wasm';
//!
//! await init();
//!
//! const rates = await (await fetch('/api/currency/rates')).text();
//! const label = format_converted_price(4999, 'USD', currency_for_locale('de'), 'de', rates);
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

use serde::{Deserialize, Serialize};
use shop_core::ExchangeRates;
use wasm_bindgen::prelude::*;

/// Cart line as held by the page
#[derive(Debug, Serialize, Deserialize)]
#[wasm_bindgen]
pub struct WasmCartItem {
    product_id: String,
    price_cents: i64,
    quantity: u32,
}

#[wasm_bindgen]
impl WasmCartItem {
    #[wasm_bindgen(constructor)]
    pub fn new(product_id: String, price_cents: i64, quantity: u32) -> Self {
        Self {
            product_id,
            price_cents,
            quantity,
        }
    }

    #[wasm_bindgen(getter)]
    pub fn product_id(&self) -> String {
        self.product_id.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn price_cents(&self) -> i64 {
        self.price_cents
    }

    #[wasm_bindgen(getter)]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Line total in cents; `undefined` if it does not fit in an `i64`
    #[wasm_bindgen]
    pub fn total_cents(&self) -> Option<i64> {
        self.price_cents.checked_mul(i64::from(self.quantity))
    }
}

/// Total for a list of `{product_id, price_cents, quantity}` objects
#[wasm_bindgen]
pub fn calculate_cart_total(items: JsValue) -> Result<i64, JsValue> {
    let items: Vec<WasmCartItem> = serde_wasm_bindgen::from_value(items)
        .map_err(|e| JsValue::from_str(&format!("Invalid cart items: {}", e)))?;

    cart_total(&items).ok_or_else(|| JsValue::from_str("Cart total is too large"))
}

fn cart_total(items: &[WasmCartItem]) -> Option<i64> {
    items
        .iter()
        .try_fold(0_i64, |sum, item| item.total_cents()?.checked_add(sum))
}

/// Format cents in `currency` for `locale`, e.g. `format_price(199, "USD", "en") == "$1.99"`
#[wasm_bindgen]
pub fn format_price(cents: i64, currency: &str, locale: &str) -> String {
    shop_core::format_price(cents, currency, locale)
}

/// Convert then format. `rates_json` is the body of `/api/currency/rates`.
#[wasm_bindgen]
pub fn format_converted_price(
    cents: i64,
    from: &str,
    to: &str,
    locale: &str,
    rates_json: &str,
) -> Result<String, JsValue> {
    let rates = parse_rates(rates_json).map_err(|e| JsValue::from_str(&e))?;
    Ok(shop_core::format_converted_price(
        cents,
        from,
        to,
        locale,
        Some(&rates),
    ))
}

/// Convert cents in `from` to major units of `to`
#[wasm_bindgen]
pub fn convert_price(cents: i64, from: &str, to: &str, rates_json: &str) -> Result<f64, JsValue> {
    let rates = parse_rates(rates_json).map_err(|e| JsValue::from_str(&e))?;
    Ok(shop_core::convert_price(cents, from, to, &rates))
}

#[wasm_bindgen]
pub fn currency_decimals(currency: &str) -> u8 {
    shop_core::currency_decimals(currency)
}

/// Default display currency for a language code
#[wasm_bindgen]
pub fn currency_for_locale(locale: &str) -> String {
    shop_core::currency_for_locale(locale).to_string()
}

/// Log to browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn parse_rates(rates_json: &str) -> Result<ExchangeRates, String> {
    serde_json::from_str(rates_json).map_err(|e| format!("Invalid rate table: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATES: &str = r#"{
        "base": "USD",
        "rates": { "USD": 1.0, "EUR": 0.92, "JPY": 149.5 },
        "updatedAt": "2024-03-01T14:05:00Z",
        "expired": false
    }"#;

    #[test]
    fn test_cart_item_total() {
        let item = WasmCartItem::new("lamp".to_string(), 1999, 2);
        assert_eq!(item.total_cents(), Some(3998));

        let items = vec![item, WasmCartItem::new("mug".to_string(), 1299, 1)];
        assert_eq!(cart_total(&items), Some(5297));
    }

    #[test]
    fn test_cart_total_overflow() {
        let item = WasmCartItem::new("yacht".to_string(), i64::MAX, 2);
        assert_eq!(item.total_cents(), None);
        assert_eq!(cart_total(&[item]), None);

        let half = || WasmCartItem::new("half".to_string(), i64::MAX / 2 + 1, 1);
        assert_eq!(cart_total(&[half(), half()]), None);
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(199, "USD", "en"), "$1.99");
        assert_eq!(format_price(0, "JPY", "en"), "¥0");
    }

    #[test]
    fn test_parse_api_rates() {
        let rates = parse_rates(RATES).unwrap();
        assert_eq!(rates.base, "USD");
        assert_eq!(rates.rate("JPY"), Some(149.5));

        assert!(parse_rates("{}").is_err());
    }

    #[test]
    fn test_converted_price() {
        let rates = parse_rates(RATES).unwrap();
        assert_eq!(
            shop_core::format_converted_price(1_000, "USD", "JPY", "ja", Some(&rates)),
            "¥1,495"
        );
    }

    #[test]
    fn test_locale_helpers() {
        assert_eq!(currency_for_locale("ja"), "JPY");
        assert_eq!(currency_decimals("JPY"), 0);
        assert_eq!(currency_decimals("USD"), 2);
        assert!(!version().is_empty());
    }
}
