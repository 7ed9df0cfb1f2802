//! Stripe Checkout integration.
//!
//! - [`client`] - REST client for creating and retrieving checkout sessions
//! - [`webhook`] - `Stripe-Signature` verification and event decoding
//! - [`types`] - Request and response payloads
//!
//! Only the embedded Checkout flow is used: the server creates a session
//! with `ui_mode=embedded` and hands its client secret to Stripe.js, which
//! mounts the payment form in the checkout page.

pub mod client;
pub mod error;
pub mod types;
pub mod webhook;

pub use client::StripeClient;
pub use error::{StripeError, WebhookError};
pub use types::{CheckoutSession, CheckoutSessionRequest, StripeEvent};
