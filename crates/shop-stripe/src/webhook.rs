//! # Stripe Webhook Handling
//!
//! `Stripe-Signature` verification and event parsing.
//!
//! The header looks like `t=1700000000,v1=<hex>[,v1=<hex>]`; each `v1` is
//! HMAC-SHA256 over `"{t}.{raw body}"` with the endpoint's signing secret.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shop_core::signing::{constant_time_eq, hmac_sha256_hex};
use shop_core::{ShopError, ShopResult, WebhookEvent, WebhookEventType};
use std::collections::HashMap;
use tracing::debug;

/// Maximum age of a signed webhook
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Header Stripe sends the signature in
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Events the webhook endpoint should be subscribed to in the Stripe Dashboard
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] = &[
    "checkout.session.completed",
    "checkout.session.async_payment_succeeded",
    "checkout.session.async_payment_failed",
    "checkout.session.expired",
];

#[derive(Debug)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> ShopResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        ShopError::WebhookVerificationFailed("Missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(ShopError::WebhookVerificationFailed(
            "No v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn signed_payload(timestamp: i64, payload: &[u8]) -> Vec<u8> {
    let mut message = format!("{}.", timestamp).into_bytes();
    message.extend_from_slice(payload);
    message
}

/// Build a `Stripe-Signature` header value (local testing, CLI replays)
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let signature = hmac_sha256_hex(secret, &signed_payload(timestamp, payload));
    format!("t={},v1={}", timestamp, signature)
}

/// Check a `Stripe-Signature` header against the raw body at `now`
pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    now: DateTime<Utc>,
) -> ShopResult<()> {
    let parsed = parse_signature_header(header)?;

    if now.timestamp().abs_diff(parsed.timestamp) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(ShopError::WebhookVerificationFailed(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let expected = hmac_sha256_hex(secret, &signed_payload(parsed.timestamp, payload));
    let valid = parsed
        .signatures
        .iter()
        .any(|sig| constant_time_eq(sig, &expected));

    if !valid {
        return Err(ShopError::WebhookVerificationFailed(
            "Signature mismatch".to_string(),
        ));
    }
    Ok(())
}

/// Parse a verified Stripe event body
pub fn parse_event(payload: &[u8]) -> ShopResult<WebhookEvent> {
    let event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
        ShopError::WebhookParseError(format!("Failed to parse webhook: {}", e))
    })?;

    debug!("Verified Stripe webhook: type={}", event.event_type);

    let object = &event.data.object;
    let text = |key: &str| object.get(key).and_then(|v| v.as_str()).map(String::from);

    let payment_status = text("payment_status");
    let event_type = match event.event_type.as_str() {
        "checkout.session.completed"
            if matches!(payment_status.as_deref(), None | Some("paid") | Some("no_payment_required")) =>
        {
            WebhookEventType::CheckoutCompleted
        }
        "checkout.session.async_payment_succeeded" => WebhookEventType::CheckoutCompleted,
        "checkout.session.expired" => WebhookEventType::CheckoutExpired,
        "checkout.session.async_payment_failed" | "payment_intent.payment_failed" => {
            WebhookEventType::PaymentFailed
        }
        other => WebhookEventType::Unknown(other.to_string()),
    };

    let customer_email = object
        .get("customer_details")
        .and_then(|cd| cd.get("email"))
        .and_then(|v| v.as_str())
        .map(String::from);

    let metadata: HashMap<String, String> = object
        .get("metadata")
        .and_then(|m| m.as_object())
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    Ok(WebhookEvent {
        event_id: event.id,
        event_type,
        provider: "stripe".to_string(),
        session_id: text("id"),
        customer_email,
        amount_paid: object.get("amount_total").and_then(|v| v.as_i64()),
        currency: text("currency"),
        metadata,
        timestamp: DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now),
    })
}

// =============================================================================
// Stripe Event Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Map<String, serde_json::Value>,
}
