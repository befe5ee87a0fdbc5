//! # Payment Hand-off Token
//!
//! Signed, short-lived reference to one order, passed from the main site
//! to the payment site in a redirect URL so the buyer does not sign in
//! twice.
//!
//! ```text
//! base64url(JSON {orderId, orderNo, exp}) "." hex(HMAC-SHA256(encoded, secret))
//! ```
//!
//! `exp` is Unix milliseconds. Verification never reports why a token was
//! rejected; the reason only goes to the log.

use crate::clock::{Clock, SystemClock};
use crate::error::{ShopError, ShopResult};
use crate::signing::{constant_time_eq, hmac_sha256_hex};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Token lifetime
pub const TOKEN_TTL_MINUTES: i64 = 15;

/// Claims carried by a hand-off token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTokenPayload {
    pub order_id: String,
    pub order_no: String,
    /// Absolute expiry, Unix milliseconds
    pub exp: i64,
}

/// Whether a token may be redeemed more than once inside its window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayPolicy {
    /// Any number of redemptions until `exp`
    #[default]
    AllowWithinWindow,
    /// First successful verification consumes the token
    SingleUse,
}

/// Issues and verifies hand-off tokens with a shared secret
pub struct PaymentTokenSigner {
    secret: Option<String>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    replay: ReplayPolicy,
    /// signature -> exp, for `SingleUse`
    consumed: DashMap<String, i64>,
}

impl PaymentTokenSigner {
    /// A signer with the given secret. `None` or an empty secret is a
    /// configuration error surfaced on `generate`.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
            ttl: Duration::minutes(TOKEN_TTL_MINUTES),
            clock: Arc::new(SystemClock),
            replay: ReplayPolicy::default(),
            consumed: DashMap::new(),
        }
    }

    /// Builder: inject a clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builder: set replay policy
    pub fn with_replay_policy(mut self, replay: ReplayPolicy) -> Self {
        self.replay = replay;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    pub fn replay_policy(&self) -> ReplayPolicy {
        self.replay
    }

    /// Issue a token for an order
    pub fn generate(&self, order_id: &str, order_no: &str) -> ShopResult<String> {
        let secret = self.secret.as_deref().ok_or_else(|| {
            ShopError::Configuration("PAYMENT_TOKEN_SECRET is not configured".to_string())
        })?;

        let payload = PaymentTokenPayload {
            order_id: order_id.to_string(),
            order_no: order_no.to_string(),
            exp: self.clock.now_millis() + self.ttl.num_milliseconds(),
        };

        let json = serde_json::to_vec(&payload)?;
        let encoded = URL_SAFE_NO_PAD.encode(json);
        let signature = hmac_sha256_hex(secret, encoded.as_bytes());

        debug!(order_no = %order_no, exp = payload.exp, "issued payment token");
        Ok(format!("{}.{}", encoded, signature))
    }

    /// Verify a token. Any failure yields `None`.
    pub fn verify(&self, token: &str) -> Option<PaymentTokenPayload> {
        let Some(secret) = self.secret.as_deref() else {
            error!("PAYMENT_TOKEN_SECRET is not configured");
            return None;
        };

        let Some((encoded, signature)) = token.split_once('.') else {
            warn!("payment token rejected: missing parts");
            return None;
        };
        if encoded.is_empty() || signature.is_empty() {
            warn!("payment token rejected: missing parts");
            return None;
        }

        let expected = hmac_sha256_hex(secret, encoded.as_bytes());
        if !constant_time_eq(signature, &expected) {
            warn!("payment token rejected: signature mismatch");
            return None;
        }

        let payload: PaymentTokenPayload = match URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| e.to_string())
            .and_then(|bytes| serde_json::from_slice(&bytes).map_err(|e| e.to_string()))
        {
            Ok(payload) => payload,
            Err(e) => {
                warn!("payment token rejected: malformed payload: {}", e);
                return None;
            }
        };

        let now = self.clock.now_millis();
        if now > payload.exp {
            warn!(order_no = %payload.order_no, "payment token rejected: expired");
            return None;
        }

        if self.replay == ReplayPolicy::SingleUse && !self.consume(signature, payload.exp, now) {
            warn!(order_no = %payload.order_no, "payment token rejected: already used");
            return None;
        }

        Some(payload)
    }

    /// Record a signature as used; false if it already was
    fn consume(&self, signature: &str, exp: i64, now: i64) -> bool {
        self.consumed.retain(|_, until| *until >= now);
        match self.consumed.entry(signature.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(exp);
                true
            }
        }
    }
}

impl std::fmt::Debug for PaymentTokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentTokenSigner")
            .field("configured", &self.secret.is_some())
            .field("ttl", &self.ttl)
            .field("replay", &self.replay)
            .finish()
    }
}

/// Token settings read from the environment
#[derive(Clone, Default)]
pub struct TokenConfig {
    pub secret: Option<String>,
    pub replay: ReplayPolicy,
}

impl TokenConfig {
    /// `PAYMENT_TOKEN_SECRET`, `PAYMENT_TOKEN_SINGLE_USE`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let single_use = lookup("PAYMENT_TOKEN_SINGLE_USE")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            secret: lookup("PAYMENT_TOKEN_SECRET"),
            replay: if single_use {
                ReplayPolicy::SingleUse
            } else {
                ReplayPolicy::AllowWithinWindow
            },
        }
    }

    pub fn into_signer(self) -> PaymentTokenSigner {
        PaymentTokenSigner::new(self.secret).with_replay_policy(self.replay)
    }
}
