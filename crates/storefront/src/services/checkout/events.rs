//! Webhook event dispatch.

use tracing::{debug, info, instrument, warn};

use boutique_core::{CheckoutStatus, UserId};

use super::error::CheckoutError;
use super::provider::PaymentProvider;
use super::store::CheckoutStore;
use super::CheckoutService;
use crate::models::checkout::StatusTransition;
use crate::stripe::{CheckoutSession, StripeEvent};

/// What a verified event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The buyer's cart was emptied (`cleared_lines` may be 0 on redelivery).
    CartCleared { user_id: UserId, cleared_lines: u64 },
    /// The session referenced a user that does not exist.
    UserNotFound,
    /// An expired or failed session was recorded.
    SessionClosed(StatusTransition),
    /// Logged only.
    Acknowledged,
    /// Event type this shop does not handle.
    Ignored,
}

impl<S: CheckoutStore, P: PaymentProvider> CheckoutService<'_, S, P> {
    /// Apply a signature-verified webhook event.
    ///
    /// Only persistence failures are returned as errors, so that Stripe
    /// redelivers; everything else is acknowledged.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Store` if the cart or session ledger could
    /// not be updated.
    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn handle_event(&self, event: &StripeEvent) -> Result<WebhookOutcome, CheckoutError> {
        match event.event_type.as_str() {
            "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
                let Some(session) = session_object(event) else {
                    return Ok(WebhookOutcome::Ignored);
                };
                self.apply_completed_session(&session).await
            }
            "checkout.session.expired" => match session_object(event) {
                Some(session) => {
                    self.apply_failed_session(&session, CheckoutStatus::Expired)
                        .await
                }
                None => Ok(WebhookOutcome::Ignored),
            },
            "checkout.session.async_payment_failed" => match session_object(event) {
                Some(session) => {
                    self.apply_failed_session(&session, CheckoutStatus::Failed)
                        .await
                }
                None => Ok(WebhookOutcome::Ignored),
            },
            "payment_intent.succeeded" => {
                info!(payment_intent = ?event.object_id(), "Payment succeeded");
                Ok(WebhookOutcome::Acknowledged)
            }
            "payment_intent.payment_failed" => {
                warn!(payment_intent = ?event.object_id(), "Payment failed");
                Ok(WebhookOutcome::Acknowledged)
            }
            other => {
                debug!(event_type = other, "Ignoring unhandled event type");
                Ok(WebhookOutcome::Ignored)
            }
        }
    }
}

fn session_object(event: &StripeEvent) -> Option<CheckoutSession> {
    match serde_json::from_value::<CheckoutSession>(event.data.object.clone()) {
        Ok(session) => Some(session),
        Err(e) => {
            warn!(error = %e, "Event payload is not a checkout session");
            None
        }
    }
}
