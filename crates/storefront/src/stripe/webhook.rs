//! Webhook signature verification.
//!
//! Stripe signs every delivery with the endpoint secret:
//! `Stripe-Signature: t=<unix ts>,v1=<hex hmac>[,v1=<hex hmac>...]`, where
//! each `v1` is `HMAC-SHA256(secret, "{t}.{raw body}")`. Several `v1`
//! entries appear while a secret is being rolled; any match is accepted.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use super::error::WebhookError;
use super::types::StripeEvent;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed timestamp, in seconds.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 300;
/// Maximum clock skew for timestamps in the future, in seconds.
pub const FUTURE_SKEW_SECS: i64 = 60;

/// Parsed `Stripe-Signature` header.
#[derive(Debug, PartialEq, Eq)]
struct SignatureHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

fn parse_header(header: &str) -> Result<SignatureHeader<'_>, WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                let parsed = value.parse::<i64>().map_err(|_| {
                    WebhookError::InvalidSignature("timestamp is not a number".to_string())
                })?;
                timestamp = Some(parsed);
            }
            Some(("v1", value)) => signatures.push(value),
            // v0 test signatures and unknown schemes are ignored
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| WebhookError::InvalidSignature("missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(WebhookError::InvalidSignature(
            "no v1 signature".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Verify a delivery's signature at time `now` (unix seconds).
///
/// # Errors
///
/// Returns `WebhookError::StaleTimestamp` outside the tolerance window and
/// `WebhookError::InvalidSignature` if the header is malformed or no
/// signature matches.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &SecretString,
    now: i64,
) -> Result<(), WebhookError> {
    let parsed = parse_header(header)?;

    let age_secs = now - parsed.timestamp;
    if age_secs > TIMESTAMP_TOLERANCE_SECS || age_secs < -FUTURE_SKEW_SECS {
        return Err(WebhookError::StaleTimestamp { age_secs });
    }

    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| WebhookError::InvalidSignature(e.to_string()))?;
    mac.update(parsed.timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = parsed.signatures.iter().any(|candidate| {
        hex::decode(candidate).is_ok_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
    });

    if matched {
        Ok(())
    } else {
        Err(WebhookError::InvalidSignature(
            "signature mismatch".to_string(),
        ))
    }
}

/// Verify a delivery and decode its event.
///
/// # Errors
///
/// Returns any [`verify_signature`] error, or `WebhookError::Malformed` if
/// the verified body is not an event.
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &SecretString,
) -> Result<StripeEvent, WebhookError> {
    verify_signature(payload, header, secret, chrono::Utc::now().timestamp())?;
    Ok(serde_json::from_slice(payload)?)
}

/// Build a `Stripe-Signature` header for `payload`.
///
/// Used by tests to build signed deliveries.
#[must_use]
pub fn sign_payload(payload: &[u8], secret: &SecretString, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}
