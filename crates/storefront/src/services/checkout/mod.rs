//! Checkout flow: cart reconciliation, Stripe session creation, and
//! applying session outcomes.
//!
//! # Cart clearing
//!
//! A cart is emptied only once Stripe reports its session `complete`. Two
//! paths observe that: the `checkout.session.completed` webhook and the
//! `/success` page the browser is sent back to. Either may run first, both
//! may run, and Stripe may redeliver the webhook, so every clear is an
//! idempotent `DELETE` and the recorded session status only moves forward.

mod error;
mod events;
mod provider;
mod reconcile;
mod store;

pub use error::CheckoutError;
pub use events::WebhookOutcome;
pub use provider::PaymentProvider;
pub use reconcile::CartReconciler;
pub use store::{CartStore, CheckoutStore, PgCheckoutStore};

use tracing::{info, instrument, warn};

use boutique_core::{CheckoutStatus, CurrencyCode, Email, UserId};

use crate::models::cart::PricedCartItem;
use crate::models::checkout::{
    CheckoutSessionRecord, CheckoutSnapshot, NewCheckoutSession, StatusTransition,
};
use crate::stripe::{CheckoutSession, CheckoutSessionRequest, StripeError};

/// The buyer a session is created for.
#[derive(Debug, Clone)]
pub struct Customer {
    pub id: UserId,
    pub email: Email,
}

/// A session ready to be mounted by Stripe.js.
#[derive(Debug, Clone)]
pub struct CreatedCheckout {
    pub session_id: String,
    pub client_secret: String,
    pub order_id: String,
    pub snapshot: CheckoutSnapshot,
}

/// Provider-side state of a session, as exposed to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub status: String,
    pub payment_status: Option<String>,
    pub customer_email: Option<String>,
}

/// What the success page found.
#[derive(Debug, Clone)]
pub struct SuccessOutcome {
    pub session: CheckoutSession,
    /// Cart lines removed by this request (0 if the webhook got there first).
    pub cleared_lines: u64,
    /// What was recorded when the session was created, for the buyer's own
    /// completed sessions.
    pub record: Option<CheckoutSessionRecord>,
}

/// Creates checkout sessions and applies their outcomes.
pub struct CheckoutService<'a, S, P> {
    store: &'a S,
    provider: &'a P,
    currency: CurrencyCode,
}

impl<'a, S: CheckoutStore, P: PaymentProvider> CheckoutService<'a, S, P> {
    #[must_use]
    pub const fn new(store: &'a S, provider: &'a P, currency: CurrencyCode) -> Self {
        Self {
            store,
            provider,
            currency,
        }
    }

    /// Reconcile the user's cart and return its sellable lines.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Store` if the cart cannot be read or pruned.
    pub async fn reconcile_cart(&self, user_id: UserId) -> Result<Vec<PricedCartItem>, CheckoutError> {
        CartReconciler::new(self.store, self.currency)
            .reconcile(user_id)
            .await
    }

    /// Open an embedded checkout session for the user's reconciled cart.
    ///
    /// `return_url` must contain `{CHECKOUT_SESSION_ID}`. The cart is never
    /// modified here beyond reconciliation pruning.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` (without calling Stripe) if nothing
    /// sellable is left, and `CheckoutError::PaymentSession` if Stripe fails.
    #[instrument(skip(self, customer, return_url), fields(user_id = %customer.id))]
    pub async fn create_session(
        &self,
        customer: &Customer,
        return_url: &str,
    ) -> Result<CreatedCheckout, CheckoutError> {
        let items = self.reconcile_cart(customer.id).await?;
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let snapshot = CheckoutSnapshot::from_items(&items, self.currency)?;
        let order_id = format!(
            "order_{}_{}",
            customer.id,
            chrono::Utc::now().timestamp_millis()
        );

        let request = CheckoutSessionRequest {
            currency: self.currency,
            line_items: snapshot.line_items.clone(),
            customer_email: customer.email.to_string(),
            return_url: return_url.to_string(),
            user_id: customer.id,
            order_id: order_id.clone(),
        };

        let session = self
            .provider
            .create_checkout_session(&request)
            .await
            .map_err(CheckoutError::PaymentSession)?;

        let client_secret = session.client_secret.clone().ok_or_else(|| {
            CheckoutError::PaymentSession(StripeError::Response(
                "session has no client_secret".to_string(),
            ))
        })?;

        let record = NewCheckoutSession {
            id: session.id.clone(),
            user_id: customer.id,
            correlation_id: order_id.clone(),
            snapshot: snapshot.clone(),
        };
        // The Stripe session already exists; a missing ledger row only costs
        // the status history.
        if let Err(e) = self.store.record_session(&record).await {
            warn!(session_id = %session.id, error = %e, "Failed to record checkout session");
        }

        info!(
            session_id = %session.id,
            order_id = %order_id,
            amount_total = snapshot.total_amount(),
            lines = snapshot.line_items.len(),
            "Checkout session created"
        );

        Ok(CreatedCheckout {
            session_id: session.id,
            client_secret,
            order_id,
            snapshot,
        })
    }

    /// Current provider status of one of `user_id`'s sessions. Read-only.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::SessionNotFound` for unknown, malformed or
    /// expired ids and for sessions opened by another user, and
    /// `CheckoutError::PaymentSession` for other failures.
    pub async fn session_status(
        &self,
        user_id: UserId,
        session_id: &str,
    ) -> Result<SessionStatus, CheckoutError> {
        let session = self.retrieve(session_id).await?;
        if session.is_expired() || session.user_id() != Some(user_id) {
            return Err(CheckoutError::SessionNotFound(session_id.to_string()));
        }

        Ok(SessionStatus {
            status: session.status.clone().unwrap_or_else(|| "open".to_string()),
            payment_status: session.payment_status.clone(),
            customer_email: session.customer_email().map(String::from),
        })
    }

    /// Apply a completed session: empty the buyer's cart and mark the
    /// recorded session `completed`.
    ///
    /// Missing or unknown user ids are logged and acknowledged so Stripe
    /// stops redelivering an event that can never succeed.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Store` on persistence failure so the delivery
    /// is retried.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn apply_completed_session(
        &self,
        session: &CheckoutSession,
    ) -> Result<WebhookOutcome, CheckoutError> {
        let Some(user_id) = session.user_id() else {
            warn!("Completed session has no usable user_id metadata");
            return Ok(WebhookOutcome::UserNotFound);
        };

        if self.store.find_user(user_id).await?.is_none() {
            warn!(user_id = %user_id, "Completed session references unknown user");
            return Ok(WebhookOutcome::UserNotFound);
        }

        let cleared_lines = self.store.clear_cart(user_id).await?;
        let transition = self
            .store
            .transition_session(&session.id, CheckoutStatus::Completed)
            .await?;

        match transition {
            StatusTransition::Unchanged => {
                info!(user_id = %user_id, "Duplicate completion, session already completed");
            }
            StatusTransition::Unknown => {
                info!(user_id = %user_id, "Completed session was not recorded locally");
            }
            StatusTransition::Applied | StatusTransition::Refused(_) => {
                info!(
                    user_id = %user_id,
                    order_id = session.order_id().unwrap_or_default(),
                    cleared_lines,
                    "Payment confirmed, cart cleared"
                );
            }
        }

        Ok(WebhookOutcome::CartCleared {
            user_id,
            cleared_lines,
        })
    }

    /// Record that a session ended without payment. The cart is kept so the
    /// buyer can try again.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Store` on persistence failure.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn apply_failed_session(
        &self,
        session: &CheckoutSession,
        status: CheckoutStatus,
    ) -> Result<WebhookOutcome, CheckoutError> {
        let transition = self.store.transition_session(&session.id, status).await?;
        if let StatusTransition::Refused(current) = transition {
            info!(current = %current, requested = %status, "Ignoring backwards status change");
        }
        Ok(WebhookOutcome::SessionClosed(transition))
    }

    /// Success-page path: if the session is complete and belongs to
    /// `user_id`, clear the cart when it still has lines.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::SessionNotFound` for unknown ids and
    /// `CheckoutError::Store` on persistence failure.
    #[instrument(skip(self))]
    pub async fn clear_after_success(
        &self,
        user_id: UserId,
        session_id: &str,
    ) -> Result<SuccessOutcome, CheckoutError> {
        let session = self.retrieve(session_id).await?;

        if !session.is_complete() {
            info!(status = ?session.status, "Success page visited before payment completed");
            return Ok(SuccessOutcome {
                session,
                cleared_lines: 0,
                record: None,
            });
        }
        if session.user_id() != Some(user_id) {
            warn!("Success page visited for another user's session");
            return Ok(SuccessOutcome {
                session,
                cleared_lines: 0,
                record: None,
            });
        }

        let cleared_lines = if self.store.cart_lines(user_id).await?.is_empty() {
            0
        } else {
            self.store.clear_cart(user_id).await?
        };
        self.store
            .transition_session(&session.id, CheckoutStatus::Completed)
            .await?;
        let record = self.store.find_session(&session.id).await?;

        Ok(SuccessOutcome {
            session,
            cleared_lines,
            record,
        })
    }

    async fn retrieve(&self, session_id: &str) -> Result<CheckoutSession, CheckoutError> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(CheckoutError::SessionNotFound(String::new()));
        }

        self.provider
            .retrieve_checkout_session(session_id)
            .await
            .map_err(|e| match e {
                StripeError::NotFound(_) => CheckoutError::SessionNotFound(session_id.to_string()),
                other => CheckoutError::PaymentSession(other),
            })
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boutique_core::{CheckoutStatus, CurrencyCode, Email, UserId};

    use super::testing::{FakeProvider, FakeStore, session};
    use super::*;

    const RETURN_URL: &str = "https://boutique.test/success?session_id={CHECKOUT_SESSION_ID}";

    fn customer(id: UserId) -> Customer {
        Customer {
            id,
            email: Email::parse("marie@boutique.fr").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_reconcile_removes_exactly_the_deleted_product() {
        let user = UserId::new(1);
        let store = FakeStore::with_user(user);
        let kept = store.add_product(1, "Widget", "9.99");
        let gone = store.add_product(2, "Gadget", "5.00");
        store.put_in_cart(user, kept, 2);
        store.put_in_cart(user, gone, 1);
        store.delete_product(gone);

        let items = CartReconciler::new(&store, CurrencyCode::EUR)
            .reconcile(user)
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_id, kept);
        assert_eq!(store.cart_size(user), 1);
    }

    #[tokio::test]
    async fn test_reconcile_does_not_write_clean_cart() {
        let user = UserId::new(1);
        let store = FakeStore::with_user(user);
        let widget = store.add_product(1, "Widget", "9.99");
        store.put_in_cart(user, widget, 1);

        CartReconciler::new(&store, CurrencyCode::EUR)
            .reconcile(user)
            .await
            .unwrap();

        assert_eq!(store.removals.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reconcile_drops_blank_titles() {
        let user = UserId::new(1);
        let store = FakeStore::with_user(user);
        let blank = store.add_product(1, "  ", "3.00");
        store.put_in_cart(user, blank, 1);

        let items = CartReconciler::new(&store, CurrencyCode::EUR)
            .reconcile(user)
            .await
            .unwrap();

        assert!(items.is_empty());
        assert_eq!(store.cart_size(user), 0);
    }

    #[tokio::test]
    async fn test_create_session_snapshots_widget_example() {
        let user = UserId::new(7);
        let store = FakeStore::with_user(user);
        let widget = store.add_product(1, "Widget", "9.99");
        store.put_in_cart(user, widget, 2);
        let provider = FakeProvider::default();
        let service = CheckoutService::new(&store, &provider, CurrencyCode::EUR);

        let created = service.create_session(&customer(user), RETURN_URL).await.unwrap();

        let line = &created.snapshot.line_items[0];
        assert_eq!(line.unit_amount, 999);
        assert_eq!(line.quantity.get(), 2);
        assert_eq!(created.snapshot.total_amount(), 1998);
        assert_eq!(created.client_secret, format!("{}_secret_abc", created.session_id));
        assert!(created.order_id.starts_with("order_7_"));

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].line_items, created.snapshot.line_items);
        assert_eq!(requests[0].customer_email, "marie@boutique.fr");
        assert_eq!(requests[0].return_url, RETURN_URL);
    }

    #[tokio::test]
    async fn test_snapshot_unaffected_by_later_price_edit() {
        let user = UserId::new(7);
        let store = FakeStore::with_user(user);
        let widget = store.add_product(1, "Widget", "9.99");
        store.put_in_cart(user, widget, 2);
        let provider = FakeProvider::default();
        let service = CheckoutService::new(&store, &provider, CurrencyCode::EUR);

        let created = service.create_session(&customer(user), RETURN_URL).await.unwrap();
        store.set_price(widget, "49.00");

        let recorded = store.sessions.lock().unwrap();
        let (record, status) = recorded.get(&created.session_id).unwrap();
        assert_eq!(*status, CheckoutStatus::Open);
        assert_eq!(record.snapshot.line_items[0].unit_amount, 999);
        assert_eq!(record.snapshot.total_amount(), 1998);
    }

    #[tokio::test]
    async fn test_create_session_does_not_clear_cart() {
        let user = UserId::new(7);
        let store = FakeStore::with_user(user);
        let widget = store.add_product(1, "Widget", "9.99");
        store.put_in_cart(user, widget, 1);
        let provider = FakeProvider::default();
        let service = CheckoutService::new(&store, &provider, CurrencyCode::EUR);

        service.create_session(&customer(user), RETURN_URL).await.unwrap();

        assert_eq!(store.cart_size(user), 1);
    }

    #[tokio::test]
    async fn test_empty_cart_never_reaches_provider() {
        let user = UserId::new(7);
        let store = FakeStore::with_user(user);
        let provider = FakeProvider::default();
        let service = CheckoutService::new(&store, &provider, CurrencyCode::EUR);

        let err = service.create_session(&customer(user), RETURN_URL).await.unwrap_err();

        assert!(matches!(err, CheckoutError::EmptyCart));
        assert_eq!(provider.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_fully_invalid_cart_is_empty() {
        let user = UserId::new(7);
        let store = FakeStore::with_user(user);
        let gone = store.add_product(1, "Widget", "9.99");
        store.put_in_cart(user, gone, 3);
        store.delete_product(gone);
        let provider = FakeProvider::default();
        let service = CheckoutService::new(&store, &provider, CurrencyCode::EUR);

        let err = service.create_session(&customer(user), RETURN_URL).await.unwrap_err();

        assert!(matches!(err, CheckoutError::EmptyCart));
        assert_eq!(provider.create_calls(), 0);
        assert_eq!(store.cart_size(user), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_cart_untouched() {
        let user = UserId::new(7);
        let store = FakeStore::with_user(user);
        let widget = store.add_product(1, "Widget", "9.99");
        store.put_in_cart(user, widget, 2);
        let provider = FakeProvider::failing();
        let service = CheckoutService::new(&store, &provider, CurrencyCode::EUR);

        let err = service.create_session(&customer(user), RETURN_URL).await.unwrap_err();

        assert!(matches!(err, CheckoutError::PaymentSession(_)));
        assert_eq!(store.cart_size(user), 1);
        assert!(store.sessions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_completed_twice_is_idempotent() {
        let user = UserId::new(7);
        let store = FakeStore::with_user(user);
        let widget = store.add_product(1, "Widget", "9.99");
        store.put_in_cart(user, widget, 2);
        let provider = FakeProvider::default();
        let service = CheckoutService::new(&store, &provider, CurrencyCode::EUR);
        let created = service.create_session(&customer(user), RETURN_URL).await.unwrap();
        let completed = session(&created.session_id, user, "complete");

        let first = service.apply_completed_session(&completed).await.unwrap();
        let second = service.apply_completed_session(&completed).await.unwrap();

        assert_eq!(first, WebhookOutcome::CartCleared { user_id: user, cleared_lines: 1 });
        assert_eq!(second, WebhookOutcome::CartCleared { user_id: user, cleared_lines: 0 });
        assert_eq!(store.cart_size(user), 0);
        assert_eq!(
            store.session_status(&created.session_id),
            Some(CheckoutStatus::Completed)
        );
    }

    #[tokio::test]
    async fn test_apply_completed_for_unknown_user_is_acknowledged() {
        let store = FakeStore::default();
        let provider = FakeProvider::default();
        let service = CheckoutService::new(&store, &provider, CurrencyCode::EUR);

        let outcome = service
            .apply_completed_session(&session("cs_test_9", UserId::new(404), "complete"))
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::UserNotFound);
    }

    #[tokio::test]
    async fn test_expired_session_keeps_cart_and_cannot_undo_completion() {
        let user = UserId::new(7);
        let store = FakeStore::with_user(user);
        let widget = store.add_product(1, "Widget", "9.99");
        store.put_in_cart(user, widget, 1);
        let provider = FakeProvider::default();
        let service = CheckoutService::new(&store, &provider, CurrencyCode::EUR);
        let created = service.create_session(&customer(user), RETURN_URL).await.unwrap();
        let id = created.session_id.as_str();

        service
            .apply_failed_session(&session(id, user, "expired"), CheckoutStatus::Expired)
            .await
            .unwrap();
        assert_eq!(store.cart_size(user), 1);
        assert_eq!(store.session_status(id), Some(CheckoutStatus::Expired));

        service
            .apply_completed_session(&session(id, user, "complete"))
            .await
            .unwrap();
        let outcome = service
            .apply_failed_session(&session(id, user, "expired"), CheckoutStatus::Expired)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            WebhookOutcome::SessionClosed(StatusTransition::Refused(CheckoutStatus::Completed))
        );
    }

    #[tokio::test]
    async fn test_session_status_unknown_and_expired() {
        let user = UserId::new(7);
        let store = FakeStore::with_user(user);
        let provider = FakeProvider::default();
        provider.insert(session("cs_test_old", user, "expired"));
        provider.insert(session("cs_test_open", user, "open"));
        let service = CheckoutService::new(&store, &provider, CurrencyCode::EUR);

        assert!(matches!(
            service.session_status(user, "cs_test_missing").await,
            Err(CheckoutError::SessionNotFound(_))
        ));
        assert!(matches!(
            service.session_status(user, "cs_test_old").await,
            Err(CheckoutError::SessionNotFound(_))
        ));
        assert!(matches!(
            service.session_status(user, "  ").await,
            Err(CheckoutError::SessionNotFound(_))
        ));

        let status = service.session_status(user, "cs_test_open").await.unwrap();
        assert_eq!(status.status, "open");
        assert_eq!(status.customer_email.as_deref(), Some("marie@boutique.fr"));
    }

    #[tokio::test]
    async fn test_session_status_hides_other_users_sessions() {
        let user = UserId::new(7);
        let store = FakeStore::with_user(user);
        let provider = FakeProvider::default();
        provider.insert(session("cs_test_theirs", UserId::new(8), "complete"));
        let service = CheckoutService::new(&store, &provider, CurrencyCode::EUR);

        let err = service
            .session_status(user, "cs_test_theirs")
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::SessionNotFound(id) if id == "cs_test_theirs"));
        assert!(service.session_status(UserId::new(8), "cs_test_theirs").await.is_ok());
    }

    #[tokio::test]
    async fn test_success_page_races_webhook() {
        let user = UserId::new(7);
        let store = FakeStore::with_user(user);
        let widget = store.add_product(1, "Widget", "9.99");
        store.put_in_cart(user, widget, 2);
        let provider = FakeProvider::default();
        let service = CheckoutService::new(&store, &provider, CurrencyCode::EUR);
        let created = service.create_session(&customer(user), RETURN_URL).await.unwrap();
        provider.complete(&created.session_id);

        let page = service
            .clear_after_success(user, &created.session_id)
            .await
            .unwrap();
        assert_eq!(page.cleared_lines, 1);
        let record = page.record.unwrap();
        assert_eq!(record.status, CheckoutStatus::Completed);
        assert_eq!(record.snapshot.total_amount(), 1998);
        assert_eq!(record.snapshot.total_quantity(), 2);

        let webhook = service
            .apply_completed_session(&session(&created.session_id, user, "complete"))
            .await
            .unwrap();
        assert_eq!(webhook, WebhookOutcome::CartCleared { user_id: user, cleared_lines: 0 });
        assert_eq!(store.cart_size(user), 0);
    }

    #[tokio::test]
    async fn test_success_page_does_not_clear_unpaid_or_foreign_sessions() {
        let user = UserId::new(7);
        let store = FakeStore::with_user(user);
        let widget = store.add_product(1, "Widget", "9.99");
        store.put_in_cart(user, widget, 2);
        let provider = FakeProvider::default();
        provider.insert(session("cs_test_open", user, "open"));
        provider.insert(session("cs_test_other", UserId::new(8), "complete"));
        let service = CheckoutService::new(&store, &provider, CurrencyCode::EUR);

        let open = service.clear_after_success(user, "cs_test_open").await.unwrap();
        let other = service.clear_after_success(user, "cs_test_other").await.unwrap();

        assert_eq!(open.cleared_lines, 0);
        assert_eq!(other.cleared_lines, 0);
        assert!(open.record.is_none());
        assert!(other.record.is_none());
        assert_eq!(store.cart_size(user), 1);
    }

    #[tokio::test]
    async fn test_success_page_reports_store_failure() {
        let user = UserId::new(7);
        let store = FakeStore::unavailable(user);
        let provider = FakeProvider::default();
        provider.insert(session("cs_test_paid", user, "complete"));
        let service = CheckoutService::new(&store, &provider, CurrencyCode::EUR);

        let err = service.clear_after_success(user, "cs_test_paid").await.unwrap_err();

        assert!(matches!(err, CheckoutError::Store(_)));
    }
}
