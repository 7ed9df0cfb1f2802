//! Stripe webhook endpoint.
//!
//! The body is taken as raw bytes because the signature covers the exact
//! payload; nothing parses it before verification.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::error::{AppError, Result};
use crate::services::checkout::WebhookOutcome;
use crate::state::AppState;
use crate::stripe::WebhookError;
use crate::stripe::webhook::construct_event;

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

fn rejected(err: WebhookError) -> AppError {
    warn!(error = %err, "Rejected webhook delivery");
    AppError::Webhook(err)
}

/// Verify, decode and apply one event.
///
/// Answers `400` for anything that fails verification, `500` when the
/// outcome could not be stored (Stripe retries), and `200` otherwise.
///
/// # Errors
///
/// Returns `AppError::Webhook` for a delivery that fails verification and
/// `AppError::Checkout` when the store could not be updated.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let secret = state
        .config()
        .stripe
        .webhook_secret
        .as_ref()
        .ok_or_else(|| rejected(WebhookError::MissingSecret))?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| rejected(WebhookError::MissingSignature))?;

    let event = construct_event(&body, signature, secret).map_err(rejected)?;

    let store = state.checkout_store();
    let outcome = state
        .checkout(&store)
        .handle_event(&event)
        .await
        .map_err(|e| {
            error!(event_id = %event.id, error = %e, "Webhook processing failed");
            AppError::from(e)
        })?;

    if let WebhookOutcome::CartCleared {
        user_id,
        cleared_lines,
    } = outcome
    {
        info!(event_id = %event.id, user_id = %user_id, cleared_lines, "Webhook applied");
    }
    Ok((StatusCode::OK, Json(json!({ "received": true }))).into_response())
}
