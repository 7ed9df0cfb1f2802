//! Stripe embedded checkout.
//!
//! `POST /create-checkout-session` reconciles the cart, opens a Stripe
//! session for it and renders the page that mounts Stripe's payment form.
//! Stripe then sends the browser to `/success`; the cart itself is cleared
//! by the webhook, with `/success` as a fallback.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use super::with_error;
use crate::error::Result;
use crate::filters;
use crate::middleware::{CspNonce, RequireAuth};
use crate::models::{CheckoutSnapshot, CurrentUser};
use crate::services::checkout::{CheckoutError, Customer};
use crate::state::AppState;

/// Query carrying a Stripe session id.
#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: Option<String>,
}

/// Embedded checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/checkout.html")]
pub struct CheckoutTemplate {
    pub user: CurrentUser,
    pub nonce: String,
    pub publishable_key: String,
    pub client_secret: String,
    pub snapshot: CheckoutSnapshot,
}

/// Payment result page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct SuccessTemplate {
    pub user: CurrentUser,
    pub complete: bool,
    pub customer_email: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: String,
    /// Line items as frozen when the session was opened.
    pub order: Option<CheckoutSnapshot>,
}

/// Checkout abandoned page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/cancel.html")]
pub struct CancelTemplate {
    pub user: CurrentUser,
}

/// JSON body of `/session-status`.
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub status: String,
    pub payment_status: Option<String>,
    pub customer_email: Option<String>,
}

fn return_url(base_url: &str) -> String {
    format!("{base_url}/success?session_id={{CHECKOUT_SESSION_ID}}")
}

/// Open a Stripe session for the user's cart and render the payment form.
#[instrument(skip(state, user, nonce), fields(user_id = %user.id))]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    nonce: CspNonce,
) -> Result<Response> {
    let customer = Customer {
        id: user.id,
        email: user.email.clone(),
    };
    let store = state.checkout_store();
    let result = state
        .checkout(&store)
        .create_session(&customer, &return_url(&state.config().base_url))
        .await;

    let created = match result {
        Ok(created) => created,
        Err(CheckoutError::EmptyCart) => {
            return Ok(Redirect::to(&with_error("/dashboard", "empty_cart")).into_response());
        }
        Err(CheckoutError::PaymentSession(e)) => {
            warn!(error = %e, "Stripe refused the checkout session");
            return Ok(Redirect::to(&with_error("/dashboard", "payment")).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    Ok(CheckoutTemplate {
        user,
        nonce: nonce.value().to_string(),
        publishable_key: state.config().stripe.publishable_key.clone(),
        client_secret: created.client_secret,
        snapshot: created.snapshot,
    }
    .into_response())
}

/// Current Stripe status of one of the user's sessions, polled by the
/// payment page. Other users' sessions answer `404`.
pub async fn session_status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<SessionQuery>,
) -> Result<Json<SessionStatusResponse>> {
    let session_id = query.session_id.unwrap_or_default();
    let store = state.checkout_store();
    let status = state
        .checkout(&store)
        .session_status(user.id, &session_id)
        .await?;

    Ok(Json(SessionStatusResponse {
        status: status.status,
        payment_status: status.payment_status,
        customer_email: status.customer_email,
    }))
}

/// Landing page after payment.
///
/// Clears the cart if the webhook has not done so yet.
#[instrument(skip(state, user, query), fields(user_id = %user.id))]
pub async fn success(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<SessionQuery>,
) -> Result<Response> {
    let Some(session_id) = query.session_id.filter(|id| !id.trim().is_empty()) else {
        return Ok(Redirect::to("/dashboard").into_response());
    };

    let store = state.checkout_store();
    let outcome = state
        .checkout(&store)
        .clear_after_success(user.id, &session_id)
        .await?;

    let session = outcome.session;
    Ok(SuccessTemplate {
        user,
        complete: session.is_complete(),
        customer_email: session.customer_email().map(String::from),
        amount_total: session.amount_total,
        currency: session
            .currency
            .as_deref()
            .unwrap_or_default()
            .to_uppercase(),
        order: outcome.record.map(|record| record.snapshot),
    }
    .into_response())
}

/// Shown when the buyer backs out of checkout. The cart is kept.
pub async fn cancel(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    CancelTemplate { user }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boutique_core::{CurrencyCode, Email, ProductId, Quantity, UserId};

    use super::*;
    use crate::models::LineItemSnapshot;

    fn buyer() -> CurrentUser {
        CurrentUser {
            id: UserId::new(7),
            email: Email::parse("marie@boutique.fr").unwrap(),
            name: "marie".to_string(),
        }
    }

    #[test]
    fn test_success_page_lists_frozen_line_items() {
        let order = CheckoutSnapshot {
            currency: CurrencyCode::EUR,
            line_items: vec![LineItemSnapshot {
                product_id: ProductId::new(1),
                name: "Widget".to_string(),
                description: "A sturdy widget".to_string(),
                image_url: None,
                unit_amount: 999,
                quantity: Quantity::new(2).unwrap(),
            }],
        };

        let html = SuccessTemplate {
            user: buyer(),
            complete: true,
            customer_email: Some("marie@boutique.fr".to_string()),
            amount_total: Some(1998),
            currency: "EUR".to_string(),
            order: Some(order),
        }
        .render()
        .unwrap();

        assert!(html.contains("Thank you for your order!"));
        assert!(html.contains("<td>Widget</td><td>2</td><td>19.98</td>"));
        assert!(html.contains("Amount paid: 19.98 EUR"));
    }

    #[test]
    fn test_unpaid_success_page_keeps_cart() {
        let html = SuccessTemplate {
            user: buyer(),
            complete: false,
            customer_email: None,
            amount_total: None,
            currency: String::new(),
            order: None,
        }
        .render()
        .unwrap();

        assert!(html.contains("Payment not completed"));
        assert!(!html.contains("<table"));
    }

    #[test]
    fn test_return_url_keeps_stripe_placeholder() {
        assert_eq!(
            return_url("https://boutique.test"),
            "https://boutique.test/success?session_id={CHECKOUT_SESSION_ID}"
        );
    }
}
