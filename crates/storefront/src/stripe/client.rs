//! Stripe REST API client.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument, warn};

use super::error::StripeError;
use super::types::{ApiErrorBody, CheckoutSession, CheckoutSessionRequest};
use crate::config::StripeConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Stripe Checkout Sessions API.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: SecretString,
    api_base: String,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("secret_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Request` if the HTTP client cannot be built.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StripeError::Request(e.to_string()))?;

        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            api_base: config.api_base.clone(),
        })
    }

    /// Create an embedded checkout session.
    ///
    /// The order correlation id doubles as the idempotency key, so a retried
    /// request cannot open a second session for the same order.
    ///
    /// # Errors
    ///
    /// Returns `StripeError` if the request fails or Stripe rejects it.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, order_id = %request.order_id))]
    pub async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, StripeError> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(self.secret_key.expose_secret(), None::<&str>)
            .header("Idempotency-Key", &request.order_id)
            .form(&request.to_form())
            .send()
            .await?;

        let session: CheckoutSession = parse_response(response, "checkout session").await?;
        debug!(session_id = %session.id, "Stripe checkout session created");
        Ok(session)
    }

    /// Retrieve a checkout session by id.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::NotFound` if Stripe does not know the id.
    #[instrument(skip(self))]
    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let response = self
            .client
            .get(format!(
                "{}/v1/checkout/sessions/{}",
                self.api_base,
                urlencoding::encode(session_id)
            ))
            .basic_auth(self.secret_key.expose_secret(), None::<&str>)
            .send()
            .await?;

        parse_response(response, session_id).await
    }
}

/// Decode a successful body or map Stripe's error envelope.
async fn parse_response<T: serde::de::DeserializeOwned>(
    response: Response,
    what: &str,
) -> Result<T, StripeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .map(|b| b.error);
    let code = detail.as_ref().and_then(|d| d.code.clone());

    if status == StatusCode::NOT_FOUND || code.as_deref() == Some("resource_missing") {
        return Err(StripeError::NotFound(what.to_string()));
    }

    let message = detail
        .and_then(|d| d.message)
        .unwrap_or_else(|| format!("HTTP {status}"));
    warn!(status = %status, code = ?code, message = %message, "Stripe API error");

    Err(StripeError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}
