//! # Price Display
//!
//! Turns integer cents into localized currency strings, optionally
//! converting into the shopper's display currency first.
//!
//! Number styles cover the storefront's language set: separators, the
//! Indian lakh grouping for `hi-IN`, the four-digit grouping exemption of
//! `es-ES` and `pl-PL`, and symbol placement.

use crate::currency::{currency_decimals, currency_for_locale, currency_info, intl_locale};
use crate::rates::{convert_price, try_convert_price, ExchangeRates, MissingRatePolicy};
use std::sync::Arc;
use tracing::warn;

const NBSP: &str = "\u{a0}";
const NNBSP: &str = "\u{202f}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grouping {
    /// 1,234,567
    Thousands,
    /// 12,34,567
    Indian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolPlacement {
    /// $1.99
    Prefix,
    /// R$ 1,99
    PrefixSpaced,
    /// 1,99 €
    SuffixSpaced,
}

#[derive(Debug, Clone, Copy)]
struct NumberStyle {
    locale: &'static str,
    group: &'static str,
    decimal: &'static str,
    grouping: Grouping,
    /// Integer digits needed before grouping kicks in
    min_grouping_digits: usize,
    placement: SymbolPlacement,
}

const fn style(
    locale: &'static str,
    group: &'static str,
    decimal: &'static str,
    placement: SymbolPlacement,
) -> NumberStyle {
    NumberStyle {
        locale,
        group,
        decimal,
        grouping: Grouping::Thousands,
        min_grouping_digits: 4,
        placement,
    }
}

static NUMBER_STYLES: &[NumberStyle] = &[
    style("en-US", ",", ".", SymbolPlacement::Prefix),
    style("zh-CN", ",", ".", SymbolPlacement::Prefix),
    style("ja-JP", ",", ".", SymbolPlacement::Prefix),
    style("ko-KR", ",", ".", SymbolPlacement::Prefix),
    style("th-TH", ",", ".", SymbolPlacement::Prefix),
    style("tr-TR", ".", ",", SymbolPlacement::Prefix),
    style("de-DE", ".", ",", SymbolPlacement::SuffixSpaced),
    style("it-IT", ".", ",", SymbolPlacement::SuffixSpaced),
    style("fr-FR", NNBSP, ",", SymbolPlacement::SuffixSpaced),
    style("ru-RU", NBSP, ",", SymbolPlacement::SuffixSpaced),
    style("vi-VN", ".", ",", SymbolPlacement::SuffixSpaced),
    style("ar-AE", ",", ".", SymbolPlacement::SuffixSpaced),
    style("pt-BR", ".", ",", SymbolPlacement::PrefixSpaced),
    style("nl-NL", ".", ",", SymbolPlacement::PrefixSpaced),
    style("id-ID", ".", ",", SymbolPlacement::PrefixSpaced),
    NumberStyle {
        min_grouping_digits: 5,
        ..style("es-ES", ".", ",", SymbolPlacement::SuffixSpaced)
    },
    NumberStyle {
        min_grouping_digits: 5,
        ..style("pl-PL", NBSP, ",", SymbolPlacement::SuffixSpaced)
    },
    NumberStyle {
        grouping: Grouping::Indian,
        ..style("hi-IN", ",", ".", SymbolPlacement::Prefix)
    },
];

fn number_style(intl: &str) -> &'static NumberStyle {
    NUMBER_STYLES
        .iter()
        .find(|s| s.locale == intl)
        .unwrap_or(&NUMBER_STYLES[0])
}

/// `floor(n / div + 0.5)` in integers, i.e. round half up.
///
/// Works in `i128` so every `i64` amount is in range.
fn div_round_half_up(n: i128, div: i128) -> i128 {
    (n * 2 + div).div_euclid(div * 2)
}

/// Express cents as an integer count of the currency's smallest
/// displayed unit.
fn scaled_amount(cents: i128, decimals: u8) -> i128 {
    match decimals {
        0 => div_round_half_up(cents, 100),
        1 => div_round_half_up(cents, 10),
        d => cents.saturating_mul(10_i128.pow(u32::from(d) - 2)),
    }
}

fn group_digits(digits: &str, style: &NumberStyle) -> String {
    if digits.len() < style.min_grouping_digits {
        return digits.to_string();
    }

    // Split into groups from the right
    let mut groups: Vec<&str> = Vec::new();
    let mut end = digits.len();
    let mut width = 3;
    while end > width {
        groups.push(&digits[end - width..end]);
        end -= width;
        if style.grouping == Grouping::Indian {
            width = 2;
        }
    }
    groups.push(&digits[..end]);
    groups.reverse();
    groups.join(style.group)
}

fn render(scaled: i128, decimals: u8, symbol: &str, style: &NumberStyle) -> String {
    let divisor = 10_u128.pow(u32::from(decimals));
    let abs = scaled.unsigned_abs();
    let int_part = (abs / divisor).to_string();
    let mut number = group_digits(&int_part, style);
    if decimals > 0 {
        let frac = abs % divisor;
        number.push_str(style.decimal);
        number.push_str(&format!("{:0width$}", frac, width = decimals as usize));
    }

    let sign = if scaled < 0 { "-" } else { "" };
    match style.placement {
        SymbolPlacement::Prefix => format!("{sign}{symbol}{number}"),
        SymbolPlacement::PrefixSpaced => format!("{sign}{symbol}{NBSP}{number}"),
        SymbolPlacement::SuffixSpaced => format!("{sign}{number}{NBSP}{symbol}"),
    }
}

fn plain_amount(scaled: i128, decimals: u8) -> String {
    let divisor = 10_u128.pow(u32::from(decimals));
    let abs = scaled.unsigned_abs();
    let sign = if scaled < 0 { "-" } else { "" };
    if decimals == 0 {
        format!("{sign}{abs}")
    } else {
        format!(
            "{sign}{}.{:0width$}",
            abs / divisor,
            abs % divisor,
            width = decimals as usize
        )
    }
}

/// Format cents in `currency` for a language code.
///
/// Unknown currency codes fall back to `"{code}{amount}"` without locale
/// rules.
pub fn format_price(cents: i64, currency: &str, locale: &str) -> String {
    format_cents(i128::from(cents), currency, locale)
}

fn format_cents(cents: i128, currency: &str, locale: &str) -> String {
    let decimals = currency_decimals(currency);
    let scaled = scaled_amount(cents, decimals);

    match currency_info(currency) {
        Some(info) => render(scaled, decimals, info.symbol, number_style(intl_locale(locale))),
        None => format!("{}{}", currency, plain_amount(scaled, decimals)),
    }
}

/// Re-express a converted major-unit amount as cents of `currency`.
/// Float-to-int casts saturate; the `i128` product cannot overflow.
fn units_to_display_cents(units: f64, currency: &str) -> i128 {
    if currency_decimals(currency) == 0 {
        ((units + 0.5).floor() as i128).saturating_mul(100)
    } else {
        (units * 100.0 + 0.5).floor() as i128
    }
}

/// Convert then format. Without rates, or for the same currency, the
/// price is shown in its source currency.
pub fn format_converted_price(
    cents: i64,
    from: &str,
    to: &str,
    locale: &str,
    rates: Option<&ExchangeRates>,
) -> String {
    let rates = match rates {
        Some(r) if from != to => r,
        _ => return format_price(cents, from, locale),
    };

    let units = convert_price(cents, from, to, rates);
    format_cents(units_to_display_cents(units, to), to, locale)
}

/// "min - max", or a single price when both ends match
pub fn format_price_range(min_cents: i64, max_cents: i64, currency: &str, locale: &str) -> String {
    if min_cents == max_cents {
        return format_price(min_cents, currency, locale);
    }
    format!(
        "{} - {}",
        format_price(min_cents, currency, locale),
        format_price(max_cents, currency, locale)
    )
}

/// Whole-percent discount from `original` to `current`; 0 when not a
/// discount
pub fn calculate_discount(original_cents: i64, current_cents: i64) -> u32 {
    if original_cents <= 0 || current_cents < 0 || current_cents >= original_cents {
        return 0;
    }
    let pct = (original_cents as f64 - current_cents as f64) / original_cents as f64 * 100.0;
    (pct + 0.5).floor() as u32
}

/// "-20%" style badge, empty when there is no discount
pub fn format_discount_badge(original_cents: i64, current_cents: i64) -> String {
    match calculate_discount(original_cents, current_cents) {
        0 => String::new(),
        pct => format!("-{}%", pct),
    }
}

/// Cents to major units, rounded for zero-decimal currencies
pub fn cents_to_unit(cents: i64, currency: &str) -> f64 {
    if currency_decimals(currency) == 0 {
        div_round_half_up(i128::from(cents), 100) as f64
    } else {
        cents as f64 / 100.0
    }
}

/// Major units to cents
pub fn unit_to_cents(amount: f64) -> i64 {
    (amount * 100.0 + 0.5).floor() as i64
}

/// Per-shopper price formatting: a display currency, a language, and the
/// current rate table.
#[derive(Debug, Clone)]
pub struct PriceFormatter {
    currency: String,
    locale: String,
    rates: Option<Arc<ExchangeRates>>,
    policy: MissingRatePolicy,
}

impl PriceFormatter {
    pub fn new(currency: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            currency: currency.into().to_ascii_uppercase(),
            locale: locale.into(),
            rates: None,
            policy: MissingRatePolicy::Degrade,
        }
    }

    /// Display currency defaults from the language
    pub fn for_locale(locale: impl Into<String>) -> Self {
        let locale = locale.into();
        Self::new(currency_for_locale(&locale), locale)
    }

    pub fn with_rates(mut self, rates: Arc<ExchangeRates>) -> Self {
        self.rates = Some(rates);
        self
    }

    pub fn with_policy(mut self, policy: MissingRatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Format a price stored in `from`, converted to the display currency
    pub fn format(&self, cents: i64, from: &str) -> String {
        if self.policy == MissingRatePolicy::FailClosed {
            if let Some(rates) = self.rates.as_deref() {
                if let Err(e) = try_convert_price(cents, from, &self.currency, rates) {
                    warn!("{}; showing price in {}", e, from);
                    return format_price(cents, from, &self.locale);
                }
            }
        }
        format_converted_price(cents, from, &self.currency, &self.locale, self.rates.as_deref())
    }

    /// Format without conversion
    pub fn format_original(&self, cents: i64, currency: &str) -> String {
        format_price(cents, currency, &self.locale)
    }

    /// Converted range
    pub fn format_range(&self, min_cents: i64, max_cents: i64, from: &str) -> String {
        if min_cents == max_cents {
            return self.format(min_cents, from);
        }
        format!("{} - {}", self.format(min_cents, from), self.format(max_cents, from))
    }

    pub fn discount_badge(&self, original_cents: i64, current_cents: i64) -> String {
        format_discount_badge(original_cents, current_cents)
    }
}
