//! Stripe-related errors.

use thiserror::Error;

/// Errors from calls to the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request could not be sent or timed out.
    #[error("Stripe request failed: {0}")]
    Request(String),

    /// Response body could not be decoded.
    #[error("Stripe response error: {0}")]
    Response(String),

    /// The requested object does not exist (`resource_missing`).
    #[error("Stripe object not found: {0}")]
    NotFound(String),

    /// Stripe rejected the request.
    #[error("Stripe API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
}

impl From<reqwest::Error> for StripeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Response(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Reasons a webhook delivery is rejected before any processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// `STRIPE_WEBHOOK_SECRET` is not configured.
    #[error("webhook secret not configured")]
    MissingSecret,

    /// The `Stripe-Signature` header is absent.
    #[error("missing Stripe-Signature header")]
    MissingSignature,

    /// The header is malformed or no `v1` signature matches.
    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),

    /// The signed timestamp is outside the accepted window.
    #[error("webhook timestamp outside tolerance (age {age_secs}s)")]
    StaleTimestamp { age_secs: i64 },

    /// The signed body is not a Stripe event.
    #[error("malformed webhook payload: {0}")]
    Malformed(#[from] serde_json::Error),
}
