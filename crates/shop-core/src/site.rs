//! # Site Configuration
//!
//! One codebase runs as one of three deployments:
//!
//! - `standalone`: holds payment credentials and checks out directly
//! - `main`: no payment credentials; hands buyers off to the payment site
//! - `payment`: holds payment credentials and only accepts hand-offs

use crate::error::{ShopError, ShopResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Locale that gets no path prefix in URLs
pub const DEFAULT_LOCALE: &str = "en";

/// Deployment role of this process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteMode {
    #[default]
    Standalone,
    Main,
    Payment,
}

impl SiteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteMode::Standalone => "standalone",
            SiteMode::Main => "main",
            SiteMode::Payment => "payment",
        }
    }

    /// Whether this deployment talks to a payment provider
    pub fn holds_payment_credentials(&self) -> bool {
        !matches!(self, SiteMode::Main)
    }
}

impl FromStr for SiteMode {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "standalone" => Ok(SiteMode::Standalone),
            "main" => Ok(SiteMode::Main),
            "payment" => Ok(SiteMode::Payment),
            other => Err(ShopError::Configuration(format!(
                "unknown SITE_MODE: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SiteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// URLs and identity of this deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub mode: SiteMode,

    /// Public base URL of this deployment (e.g., "https://shop.example.com")
    pub app_url: String,

    /// Shown to payment providers as `app_name` metadata
    pub app_name: String,

    /// Where buyers return after paying on the payment site
    #[serde(default)]
    pub main_site_url: Option<String>,

    /// Target of the hand-off redirect in `main` mode
    #[serde(default)]
    pub payment_site_url: Option<String>,

    pub default_locale: String,
}

impl SiteConfig {
    pub fn new(mode: SiteMode, app_url: impl Into<String>) -> Self {
        Self {
            mode,
            app_url: trim_url(app_url.into()),
            app_name: "Handoff Cart".to_string(),
            main_site_url: None,
            payment_site_url: None,
            default_locale: DEFAULT_LOCALE.to_string(),
        }
    }

    /// Builder: set app name
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Builder: set main site URL
    pub fn with_main_site_url(mut self, url: impl Into<String>) -> Self {
        self.main_site_url = Some(trim_url(url.into()));
        self
    }

    /// Builder: set payment site URL
    pub fn with_payment_site_url(mut self, url: impl Into<String>) -> Self {
        self.payment_site_url = Some(trim_url(url.into()));
        self
    }

    /// Builder: set default locale
    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }

    /// Load from environment variables
    pub fn from_env() -> ShopResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup (environment, test map)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ShopResult<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mode = get("SITE_MODE")
            .map(|m| m.parse::<SiteMode>())
            .transpose()?
            .unwrap_or_default();
        let app_url = get("APP_URL").unwrap_or_else(|| "http://localhost:3000".to_string());

        let mut config = Self::new(mode, app_url);
        if let Some(name) = get("APP_NAME") {
            config = config.with_app_name(name);
        }
        if let Some(url) = get("MAIN_SITE_URL") {
            config = config.with_main_site_url(url);
        }
        if let Some(url) = get("PAYMENT_SITE_URL") {
            config = config.with_payment_site_url(url);
        }
        if let Some(locale) = get("DEFAULT_LOCALE") {
            config = config.with_default_locale(locale);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check mode-specific requirements
    pub fn validate(&self) -> ShopResult<()> {
        if self.mode == SiteMode::Main && self.payment_site_url.is_none() {
            return Err(ShopError::Configuration(
                "PAYMENT_SITE_URL is required when SITE_MODE=main".to_string(),
            ));
        }
        Ok(())
    }

    /// App URL with a `/{locale}` prefix unless it is the default locale
    pub fn localized_base_url(&self, locale: Option<&str>) -> String {
        match locale {
            Some(l) if !l.is_empty() && l != self.default_locale => {
                format!("{}/{}", self.app_url, l)
            }
            _ => self.app_url.clone(),
        }
    }

    /// Main site URL, falling back to this deployment's URL
    pub fn main_site_url(&self) -> &str {
        self.main_site_url.as_deref().unwrap_or(&self.app_url)
    }

    /// Redirect target on the payment site for a shop-order token
    pub fn handoff_url(&self, token: &str) -> ShopResult<String> {
        let payment_site = self.payment_site_url.as_deref().ok_or_else(|| {
            ShopError::Configuration("PAYMENT_SITE_URL is not configured".to_string())
        })?;
        Ok(format!("{}/pay?token={}&type=shop", payment_site, token))
    }

    /// Error unless running in `mode`
    pub fn require_mode(&self, mode: SiteMode) -> ShopResult<()> {
        if self.mode == mode {
            Ok(())
        } else {
            Err(ShopError::WrongSiteMode {
                expected: mode.to_string(),
            })
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::new(SiteMode::Standalone, "http://localhost:3000")
    }
}

/// Buyer return page after a successful shop checkout
pub fn shop_success_url(base: &str, order_no: &str) -> String {
    format!("{}/shop/order/{}?status=success", base, order_no)
}

/// Buyer return page after a cancelled shop checkout
pub fn shop_cancel_url(base: &str, order_no: &str) -> String {
    format!("{}/checkout?order_no={}", base, order_no)
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
