//! # Exchange Rates
//!
//! Rate table value object and the conversion math over it.
//!
//! Rates are "units of currency per one unit of base". Conversions between
//! two non-base currencies pivot through the base.

use crate::currency::BASE_CURRENCY;
use crate::error::{ShopError, ShopResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Freshness window for cached rate tables
pub const RATES_TTL_SECS: i64 = 3600;

/// Freshness window as a `chrono::Duration`
pub fn rates_ttl() -> Duration {
    Duration::seconds(RATES_TTL_SECS)
}

/// Approximate rates used when no cache exists and the rate API is down
static FALLBACK_RATES: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("CNY", 7.24),
    ("JPY", 149.5),
    ("KRW", 1320.0),
    ("EUR", 0.92),
    ("GBP", 0.79),
    ("BRL", 4.97),
    ("RUB", 92.5),
    ("AED", 3.67),
    ("INR", 83.2),
    ("THB", 35.5),
    ("VND", 24500.0),
    ("IDR", 15700.0),
    ("TRY", 32.1),
    ("PLN", 4.02),
    ("MYR", 4.72),
    ("SGD", 1.34),
    ("HKD", 7.82),
    ("TWD", 31.8),
    ("AUD", 1.53),
    ("CAD", 1.36),
    ("CHF", 0.88),
    ("SEK", 10.5),
    ("NOK", 10.7),
    ("DKK", 6.87),
    ("MXN", 17.2),
    ("ZAR", 18.9),
    ("PHP", 56.1),
    ("NZD", 1.64),
    ("SAR", 3.75),
];

/// A rate table against a single base currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRates {
    /// Pivot currency code
    pub base: String,
    /// Currency code -> units per one unit of base
    pub rates: HashMap<String, f64>,
    /// When the table was fetched
    pub updated_at: DateTime<Utc>,
}

impl ExchangeRates {
    pub fn new(
        base: impl Into<String>,
        rates: HashMap<String, f64>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            base: base.into(),
            rates,
            updated_at,
        }
    }

    /// The hardcoded fallback table, stamped with `now`
    pub fn fallback(now: DateTime<Utc>) -> Self {
        let rates = FALLBACK_RATES
            .iter()
            .map(|(code, rate)| (code.to_string(), *rate))
            .collect();
        Self::new(BASE_CURRENCY, rates, now)
    }

    /// Usable rate for a currency. Zero, negative and non-finite entries
    /// count as missing.
    pub fn rate(&self, currency: &str) -> Option<f64> {
        self.rates
            .get(currency)
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
    }

    /// Rate for a single currency: 1 for the base, 1 when unknown
    pub fn rate_or_one(&self, currency: &str) -> f64 {
        if currency == self.base {
            return 1.0;
        }
        self.rate(currency).unwrap_or(1.0)
    }

    /// Whether the table is older than `ttl` at `now`
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.updated_at > ttl
    }

    /// Short date/time of the last update, e.g. "2024-03-01 14:05 UTC"
    pub fn updated_at_display(&self) -> String {
        self.updated_at.format("%Y-%m-%d %H:%M UTC").to_string()
    }
}

/// What to do when a conversion needs a rate the table lacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingRatePolicy {
    /// Return the source amount unconverted
    #[default]
    Degrade,
    /// Refuse to convert
    FailClosed,
}

impl FromStr for MissingRatePolicy {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "degrade" => Ok(MissingRatePolicy::Degrade),
            "fail" | "fail_closed" | "fail-closed" => Ok(MissingRatePolicy::FailClosed),
            other => Err(ShopError::Configuration(format!(
                "unknown missing-rate policy: {}",
                other
            ))),
        }
    }
}

/// Convert cents in `from` into major units of `to`.
///
/// Returns the source amount (in major units) when a needed rate is
/// missing.
pub fn convert_price(amount_cents: i64, from: &str, to: &str, rates: &ExchangeRates) -> f64 {
    let amount = amount_cents as f64 / 100.0;
    try_convert_price(amount_cents, from, to, rates).unwrap_or(amount)
}

/// Convert cents in `from` into major units of `to`, failing when a
/// needed rate is missing.
pub fn try_convert_price(
    amount_cents: i64,
    from: &str,
    to: &str,
    rates: &ExchangeRates,
) -> ShopResult<f64> {
    let amount = amount_cents as f64 / 100.0;
    if from == to {
        return Ok(amount);
    }

    let missing = || ShopError::RateNotAvailable {
        from: from.to_string(),
        to: to.to_string(),
    };

    if from == rates.base {
        let rate = rates.rate(to).ok_or_else(missing)?;
        return Ok(amount * rate);
    }

    if to == rates.base {
        let rate = rates.rate(from).ok_or_else(missing)?;
        return Ok(amount / rate);
    }

    let from_rate = rates.rate(from).ok_or_else(missing)?;
    let to_rate = rates.rate(to).ok_or_else(missing)?;
    Ok(amount / from_rate * to_rate)
}

/// Convert under an explicit policy
pub fn convert_with_policy(
    amount_cents: i64,
    from: &str,
    to: &str,
    rates: &ExchangeRates,
    policy: MissingRatePolicy,
) -> ShopResult<f64> {
    match policy {
        MissingRatePolicy::Degrade => Ok(convert_price(amount_cents, from, to, rates)),
        MissingRatePolicy::FailClosed => try_convert_price(amount_cents, from, to, rates),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ExchangeRates {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        ExchangeRates::fallback(now)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_same_currency_is_cents_over_100() {
        let rates = table();
        for code in ["USD", "EUR", "JPY", "XYZ"] {
            assert_eq!(convert_price(12_345, code, code, &rates), 123.45);
        }
    }

    #[test]
    fn test_from_base() {
        let rates = table();
        assert!(approx(convert_price(10_000, "USD", "EUR", &rates), 92.0));
    }

    #[test]
    fn test_to_base() {
        let rates = table();
        assert!(approx(convert_price(14_950, "JPY", "USD", &rates), 1.0));
    }

    #[test]
    fn test_pivot_consistency() {
        let rates = table();
        let cents = 98_765;

        let direct = convert_price(cents, "EUR", "JPY", &rates);
        let via_base = convert_price(cents, "EUR", "USD", &rates);
        let two_hop = via_base * rates.rate("JPY").unwrap();

        assert!(approx(direct, two_hop));
    }

    #[test]
    fn test_missing_rate_degrades_to_source_amount() {
        let rates = table();
        assert_eq!(convert_price(500, "USD", "XYZ", &rates), 5.0);
        assert_eq!(convert_price(500, "XYZ", "EUR", &rates), 5.0);
    }

    #[test]
    fn test_zero_rate_counts_as_missing() {
        let mut rates = table();
        rates.rates.insert("EUR".into(), 0.0);
        assert_eq!(convert_price(500, "EUR", "USD", &rates), 5.0);
        assert!(rates.rate("EUR").is_none());
    }

    #[test]
    fn test_fail_closed_reports_missing_rate() {
        let rates = table();
        let err =
            convert_with_policy(500, "USD", "XYZ", &rates, MissingRatePolicy::FailClosed)
                .unwrap_err();
        assert!(matches!(err, ShopError::RateNotAvailable { .. }));

        let ok = convert_with_policy(500, "USD", "XYZ", &rates, MissingRatePolicy::Degrade);
        assert_eq!(ok.unwrap(), 5.0);
    }

    #[test]
    fn test_rate_or_one() {
        let rates = table();
        assert_eq!(rates.rate_or_one("USD"), 1.0);
        assert_eq!(rates.rate_or_one("GBP"), 0.79);
        assert_eq!(rates.rate_or_one("XYZ"), 1.0);
    }

    #[test]
    fn test_expiry() {
        let rates = table();
        let ttl = rates_ttl();
        assert!(!rates.is_expired(rates.updated_at + Duration::minutes(59), ttl));
        assert!(rates.is_expired(rates.updated_at + Duration::minutes(61), ttl));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("degrade".parse::<MissingRatePolicy>().unwrap(), MissingRatePolicy::Degrade);
        assert_eq!(
            "Fail-Closed".parse::<MissingRatePolicy>().unwrap(),
            MissingRatePolicy::FailClosed
        );
        assert!("maybe".parse::<MissingRatePolicy>().is_err());
    }

    #[test]
    fn test_serialized_shape_is_camel_case() {
        let json = serde_json::to_value(table()).unwrap();
        assert_eq!(json["base"], "USD");
        assert!(json.get("updatedAt").is_some());
        assert_eq!(json["rates"]["JPY"], 149.5);
    }
}
