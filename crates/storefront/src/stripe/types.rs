//! Stripe request and response payloads.
//!
//! Only the fields the shop reads are modeled; everything else in Stripe's
//! objects is ignored on deserialization.

use std::collections::HashMap;

use serde::Deserialize;

use boutique_core::{CurrencyCode, UserId};

use crate::models::checkout::LineItemSnapshot;

/// Metadata key carrying the buyer's user id.
pub const METADATA_USER_ID: &str = "user_id";
/// Metadata key carrying the order correlation id.
pub const METADATA_ORDER_ID: &str = "order_id";

/// Everything needed to open an embedded checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub currency: CurrencyCode,
    pub line_items: Vec<LineItemSnapshot>,
    pub customer_email: String,
    /// Where Stripe sends the browser after payment. Must contain the
    /// literal `{CHECKOUT_SESSION_ID}` placeholder.
    pub return_url: String,
    pub user_id: UserId,
    /// Correlation id, also used as the request's idempotency key.
    pub order_id: String,
}

impl CheckoutSessionRequest {
    /// Form-encoded body for `POST /v1/checkout/sessions`.
    #[must_use]
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("ui_mode".to_string(), "embedded".to_string()),
            ("return_url".to_string(), self.return_url.clone()),
            ("customer_email".to_string(), self.customer_email.clone()),
            (
                format!("metadata[{METADATA_USER_ID}]"),
                self.user_id.to_string(),
            ),
            (format!("metadata[{METADATA_ORDER_ID}]"), self.order_id.clone()),
        ];

        for (i, item) in self.line_items.iter().enumerate() {
            let prefix = format!("line_items[{i}]");
            form.push((
                format!("{prefix}[price_data][currency]"),
                self.currency.stripe_code().to_string(),
            ));
            form.push((
                format!("{prefix}[price_data][unit_amount]"),
                item.unit_amount.to_string(),
            ));
            form.push((
                format!("{prefix}[price_data][product_data][name]"),
                item.name.clone(),
            ));
            if !item.description.is_empty() {
                form.push((
                    format!("{prefix}[price_data][product_data][description]"),
                    item.description.clone(),
                ));
            }
            if let Some(image_url) = &item.image_url {
                form.push((
                    format!("{prefix}[price_data][product_data][images][0]"),
                    image_url.clone(),
                ));
            }
            form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        }

        form
    }
}

/// A Stripe Checkout Session object.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// `open`, `complete` or `expired`.
    pub status: Option<String>,
    /// `paid`, `unpaid` or `no_payment_required`.
    pub payment_status: Option<String>,
    pub client_secret: Option<String>,
    pub customer_email: Option<String>,
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
}

/// Customer details collected by the payment form.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
}

impl CheckoutSession {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status.as_deref() == Some("complete")
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.status.as_deref() == Some("expired")
    }

    /// The buyer's user id from metadata, if present and well-formed.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.metadata
            .get(METADATA_USER_ID)
            .and_then(|raw| raw.trim().parse::<i32>().ok())
            .map(UserId::new)
    }

    #[must_use]
    pub fn order_id(&self) -> Option<&str> {
        self.metadata.get(METADATA_ORDER_ID).map(String::as_str)
    }

    /// Email entered in the payment form, falling back to the prefilled one.
    #[must_use]
    pub fn customer_email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|details| details.email.as_deref())
            .or(self.customer_email.as_deref())
    }
}

/// A webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    pub data: StripeEventData,
}

/// The object an event is about; its shape depends on the event type.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

impl StripeEvent {
    /// The `id` field of the event's object, for logging.
    #[must_use]
    pub fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(serde_json::Value::as_str)
    }
}

/// Error body returned by the Stripe API.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    pub code: Option<String>,
    pub message: Option<String>,
}
