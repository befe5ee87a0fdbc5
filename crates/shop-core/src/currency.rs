//! # Currency Table
//!
//! Display currencies supported by the storefront, plus the locale
//! defaults used when a shopper has not picked a currency.
//!
//! Prices are stored as integer cents (hundredths of the major unit) for
//! every currency, including zero-decimal ones such as JPY. Decimal places
//! here only control how an amount is rounded and displayed.

use serde::Serialize;

/// Pivot currency all exchange rates are expressed against
pub const BASE_CURRENCY: &str = "USD";

/// Currency used when nothing else is known
pub const DEFAULT_CURRENCY: &str = "USD";

/// Number-format locale used for unknown language codes
pub const DEFAULT_INTL_LOCALE: &str = "en-US";

/// Static metadata for a display currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CurrencyInfo {
    /// ISO 4217 code
    pub code: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
    /// Name in the currency's home language
    pub name_local: &'static str,
    /// Digits after the decimal point when displayed
    pub decimals: u8,
}

const fn info(
    code: &'static str,
    symbol: &'static str,
    name: &'static str,
    name_local: &'static str,
    decimals: u8,
) -> CurrencyInfo {
    CurrencyInfo {
        code,
        symbol,
        name,
        name_local,
        decimals,
    }
}

/// All supported display currencies
pub static CURRENCIES: &[CurrencyInfo] = &[
    info("USD", "$", "US Dollar", "US Dollar", 2),
    info("CNY", "¥", "Chinese Yuan", "人民币", 2),
    info("JPY", "¥", "Japanese Yen", "日本円", 0),
    info("KRW", "₩", "South Korean Won", "원", 0),
    info("EUR", "€", "Euro", "Euro", 2),
    info("GBP", "£", "British Pound", "British Pound", 2),
    info("BRL", "R$", "Brazilian Real", "Real", 2),
    info("RUB", "₽", "Russian Ruble", "Рубль", 2),
    info("AED", "د.إ", "UAE Dirham", "درهم", 2),
    info("INR", "₹", "Indian Rupee", "रुपया", 2),
    info("THB", "฿", "Thai Baht", "บาท", 2),
    info("VND", "₫", "Vietnamese Dong", "Đồng", 0),
    info("IDR", "Rp", "Indonesian Rupiah", "Rupiah", 0),
    info("TRY", "₺", "Turkish Lira", "Lira", 2),
    info("PLN", "zł", "Polish Zloty", "Złoty", 2),
    info("MYR", "RM", "Malaysian Ringgit", "Ringgit", 2),
    info("SGD", "S$", "Singapore Dollar", "Singapore Dollar", 2),
    info("HKD", "HK$", "Hong Kong Dollar", "港幣", 2),
    info("TWD", "NT$", "Taiwan Dollar", "新台幣", 0),
    info("AUD", "A$", "Australian Dollar", "Australian Dollar", 2),
    info("CAD", "C$", "Canadian Dollar", "Canadian Dollar", 2),
    info("CHF", "CHF", "Swiss Franc", "Franken", 2),
    info("SEK", "kr", "Swedish Krona", "Krona", 2),
    info("NOK", "kr", "Norwegian Krone", "Krone", 2),
    info("DKK", "kr", "Danish Krone", "Krone", 2),
    info("MXN", "$", "Mexican Peso", "Peso", 2),
    info("ZAR", "R", "South African Rand", "Rand", 2),
    info("PHP", "₱", "Philippine Peso", "Peso", 2),
    info("NZD", "NZ$", "New Zealand Dollar", "New Zealand Dollar", 2),
    info("SAR", "﷼", "Saudi Riyal", "ريال", 2),
];

/// Language code -> default display currency
static LOCALE_CURRENCIES: &[(&str, &str)] = &[
    ("en", "USD"),
    ("zh", "CNY"),
    ("ja", "JPY"),
    ("ko", "KRW"),
    ("de", "EUR"),
    ("fr", "EUR"),
    ("es", "EUR"),
    ("pt", "BRL"),
    ("it", "EUR"),
    ("ru", "RUB"),
    ("ar", "AED"),
    ("hi", "INR"),
    ("th", "THB"),
    ("vi", "VND"),
    ("id", "IDR"),
    ("tr", "TRY"),
    ("pl", "PLN"),
    ("nl", "EUR"),
];

/// Language code -> number-format locale
static INTL_LOCALES: &[(&str, &str)] = &[
    ("en", "en-US"),
    ("zh", "zh-CN"),
    ("ja", "ja-JP"),
    ("ko", "ko-KR"),
    ("de", "de-DE"),
    ("fr", "fr-FR"),
    ("es", "es-ES"),
    ("pt", "pt-BR"),
    ("it", "it-IT"),
    ("ru", "ru-RU"),
    ("ar", "ar-AE"),
    ("hi", "hi-IN"),
    ("th", "th-TH"),
    ("vi", "vi-VN"),
    ("id", "id-ID"),
    ("tr", "tr-TR"),
    ("pl", "pl-PL"),
    ("nl", "nl-NL"),
];

/// Look up a supported currency by code (case-insensitive)
pub fn currency_info(code: &str) -> Option<&'static CurrencyInfo> {
    CURRENCIES
        .iter()
        .find(|c| c.code.eq_ignore_ascii_case(code))
}

/// Whether the code is a supported display currency
pub fn is_supported(code: &str) -> bool {
    currency_info(code).is_some()
}

/// Display decimals for a currency; unknown codes use 2
pub fn currency_decimals(code: &str) -> u8 {
    currency_info(code).map(|c| c.decimals).unwrap_or(2)
}

/// All supported currency codes, in table order
pub fn supported_currencies() -> impl Iterator<Item = &'static str> {
    CURRENCIES.iter().map(|c| c.code)
}

/// Default display currency for a language code
pub fn currency_for_locale(locale: &str) -> &'static str {
    lookup(LOCALE_CURRENCIES, locale).unwrap_or(DEFAULT_CURRENCY)
}

/// Number-format locale for a language code
pub fn intl_locale(locale: &str) -> &'static str {
    lookup(INTL_LOCALES, locale).unwrap_or(DEFAULT_INTL_LOCALE)
}

fn lookup(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}
