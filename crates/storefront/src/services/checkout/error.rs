//! Checkout error types.

use thiserror::Error;

use boutique_core::PriceError;

use crate::db::RepositoryError;
use crate::stripe::StripeError;

/// Errors from cart reconciliation and checkout session handling.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing sellable is left in the cart.
    #[error("cart is empty")]
    EmptyCart,

    /// The payment provider could not create or return the session.
    #[error("payment session error: {0}")]
    PaymentSession(#[source] StripeError),

    /// The session id is unknown to the provider or has expired.
    #[error("checkout session not found: {0}")]
    SessionNotFound(String),

    /// A cart amount could not be expressed in minor units.
    #[error("pricing error: {0}")]
    Pricing(#[from] PriceError),

    /// Persistence failed; the caller should surface a 5xx.
    #[error("store error: {0}")]
    Store(#[from] RepositoryError),
}

