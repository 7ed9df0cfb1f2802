//! Payment provider seam.

#![allow(async_fn_in_trait)]

use crate::stripe::{CheckoutSession, CheckoutSessionRequest, StripeClient, StripeError};

/// The calls the checkout flow makes to the payment provider.
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, StripeError>;

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, StripeError>;
}

impl PaymentProvider for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, StripeError> {
        Self::create_checkout_session(self, request).await
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, StripeError> {
        Self::retrieve_checkout_session(self, session_id).await
    }
}
