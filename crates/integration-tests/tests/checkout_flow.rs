//! Cart to payment to cleared cart, through the public checkout API.
//!
//! The stores and payment provider are in-memory; webhook events are
//! signed and verified exactly as the HTTP route does it.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::json;

use boutique_core::{CheckoutStatus, CurrencyCode, Email, ProductId, Quantity, UserId};
use boutique_integration_tests::WEBHOOK_SECRET;
use boutique_storefront::db::RepositoryError;
use boutique_storefront::models::User;
use boutique_storefront::models::cart::{CartLine, CartProduct};
use boutique_storefront::models::checkout::{
    CheckoutSessionRecord, NewCheckoutSession, StatusTransition,
};
use boutique_storefront::services::checkout::{
    CartStore, CheckoutError, CheckoutService, CheckoutStore, Customer, PaymentProvider,
    WebhookOutcome,
};
use boutique_storefront::stripe::webhook::{construct_event, sign_payload};
use boutique_storefront::stripe::{
    CheckoutSession, CheckoutSessionRequest, StripeError, StripeEvent,
};

const RETURN_URL: &str = "http://localhost:3000/success?session_id={CHECKOUT_SESSION_ID}";

#[derive(Default)]
struct MemoryShop {
    users: Vec<User>,
    catalog: Mutex<HashMap<ProductId, CartProduct>>,
    carts: Mutex<HashMap<UserId, BTreeMap<ProductId, Quantity>>>,
    sessions: Mutex<HashMap<String, CheckoutSessionRecord>>,
}

impl MemoryShop {
    fn with_user(id: i32, email: &str) -> (Self, Customer) {
        let user = User {
            id: UserId::new(id),
            name: "marie".to_string(),
            email: Email::parse(email).unwrap(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let customer = Customer {
            id: user.id,
            email: user.email.clone(),
        };
        (
            Self {
                users: vec![user],
                ..Self::default()
            },
            customer,
        )
    }

    fn list(&self, id: i32, title: &str, price: &str) -> ProductId {
        let id = ProductId::new(id);
        self.catalog.lock().unwrap().insert(
            id,
            CartProduct {
                title: title.to_string(),
                description: format!("{title}, handmade"),
                price: price.parse::<Decimal>().unwrap(),
                image_url: format!("https://images.boutique.test/{id}.jpg"),
            },
        );
        id
    }

    fn unlist(&self, id: ProductId) {
        self.catalog.lock().unwrap().remove(&id);
    }

    fn add_to_cart(&self, user_id: UserId, product_id: ProductId, quantity: i32) {
        let quantity = Quantity::new(quantity).unwrap();
        self.carts
            .lock()
            .unwrap()
            .entry(user_id)
            .or_default()
            .entry(product_id)
            .and_modify(|existing| *existing = existing.saturating_add(quantity))
            .or_insert(quantity);
    }

    fn cart_len(&self, user_id: UserId) -> usize {
        self.carts
            .lock()
            .unwrap()
            .get(&user_id)
            .map_or(0, BTreeMap::len)
    }

    fn status(&self, session_id: &str) -> Option<CheckoutStatus> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .map(|record| record.status)
    }
}

impl CartStore for MemoryShop {
    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let catalog = self.catalog.lock().unwrap();
        Ok(self
            .carts
            .lock()
            .unwrap()
            .get(&user_id)
            .into_iter()
            .flatten()
            .map(|(product_id, quantity)| CartLine {
                product_id: *product_id,
                quantity: *quantity,
                product: catalog.get(product_id).cloned(),
            })
            .collect())
    }

    async fn remove_products(
        &self,
        user_id: UserId,
        product_ids: &[ProductId],
    ) -> Result<u64, RepositoryError> {
        let mut carts = self.carts.lock().unwrap();
        let Some(cart) = carts.get_mut(&user_id) else {
            return Ok(0);
        };
        let before = cart.len();
        cart.retain(|product_id, _| !product_ids.contains(product_id));
        Ok((before - cart.len()) as u64)
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        Ok(self
            .carts
            .lock()
            .unwrap()
            .remove(&user_id)
            .map_or(0, |cart| cart.len() as u64))
    }
}

impl CheckoutStore for MemoryShop {
    async fn find_user(&self, user_id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.iter().find(|user| user.id == user_id).cloned())
    }

    async fn record_session(&self, session: &NewCheckoutSession) -> Result<(), RepositoryError> {
        let record = CheckoutSessionRecord {
            id: session.id.clone(),
            user_id: session.user_id,
            correlation_id: session.correlation_id.clone(),
            status: CheckoutStatus::Open,
            amount_total: session.snapshot.total_amount(),
            snapshot: session.snapshot.clone(),
            created_at: chrono::Utc::now(),
            completed_at: None,
        };
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), record);
        Ok(())
    }

    async fn find_session(
        &self,
        session_id: &str,
    ) -> Result<Option<CheckoutSessionRecord>, RepositoryError> {
        Ok(self.sessions.lock().unwrap().get(session_id).cloned())
    }

    async fn transition_session(
        &self,
        session_id: &str,
        next: CheckoutStatus,
    ) -> Result<StatusTransition, RepositoryError> {
        let mut sessions = self.sessions.lock().unwrap();
        let Some(record) = sessions.get_mut(session_id) else {
            return Ok(StatusTransition::Unknown);
        };
        if record.status == next {
            Ok(StatusTransition::Unchanged)
        } else if record.status.can_transition_to(next) {
            record.status = next;
            if next == CheckoutStatus::Completed {
                record.completed_at = Some(chrono::Utc::now());
            }
            Ok(StatusTransition::Applied)
        } else {
            Ok(StatusTransition::Refused(record.status))
        }
    }
}

#[derive(Default)]
struct MemoryStripe {
    requests: Mutex<Vec<CheckoutSessionRequest>>,
    sessions: Mutex<HashMap<String, CheckoutSession>>,
}

impl MemoryStripe {
    fn pay(&self, session_id: &str) {
        if let Some(session) = self.sessions.lock().unwrap().get_mut(session_id) {
            session.status = Some("complete".to_string());
            session.payment_status = Some("paid".to_string());
        }
    }
}

impl PaymentProvider for MemoryStripe {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, StripeError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        let id = format!("cs_test_flow_{}", requests.len());

        let session: CheckoutSession = serde_json::from_value(json!({
            "id": id,
            "status": "open",
            "payment_status": "unpaid",
            "client_secret": format!("{id}_secret"),
            "customer_email": request.customer_email,
            "amount_total": request.line_items.iter().map(|item| item.amount()).sum::<i64>(),
            "currency": request.currency.stripe_code(),
            "metadata": {
                "user_id": request.user_id.to_string(),
                "order_id": request.order_id,
            }
        }))
        .map_err(|e| StripeError::Response(e.to_string()))?;

        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, StripeError> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| StripeError::NotFound(session_id.to_string()))
    }
}

/// Sign and verify a delivery the way `/webhook` receives it.
fn delivered(event_type: &str, session: &CheckoutSession) -> StripeEvent {
    let payload = serde_json::to_vec(&json!({
        "id": format!("evt_{}", session.id),
        "type": event_type,
        "created": chrono::Utc::now().timestamp(),
        "data": { "object": {
            "id": session.id,
            "object": "checkout.session",
            "status": session.status,
            "payment_status": session.payment_status,
            "metadata": session.metadata,
        }}
    }))
    .unwrap();
    let secret = SecretString::from(WEBHOOK_SECRET);
    let header = sign_payload(&payload, &secret, chrono::Utc::now().timestamp());
    construct_event(&payload, &header, &secret).unwrap()
}

#[tokio::test]
async fn test_paid_session_clears_cart_once() {
    let (shop, customer) = MemoryShop::with_user(7, "marie@boutique.test");
    let stripe = MemoryStripe::default();
    let checkout = CheckoutService::new(&shop, &stripe, CurrencyCode::EUR);

    let scarf = shop.list(1, "Wool scarf", "9.99");
    shop.add_to_cart(customer.id, scarf, 1);
    shop.add_to_cart(customer.id, scarf, 1);

    let created = checkout.create_session(&customer, RETURN_URL).await.unwrap();
    assert_eq!(created.snapshot.total_amount(), 1998);
    assert_eq!(created.client_secret, format!("{}_secret", created.session_id));
    assert_eq!(shop.cart_len(customer.id), 1, "opening a session keeps the cart");
    assert_eq!(shop.status(&created.session_id), Some(CheckoutStatus::Open));

    stripe.pay(&created.session_id);
    let paid = stripe
        .retrieve_checkout_session(&created.session_id)
        .await
        .unwrap();
    let event = delivered("checkout.session.completed", &paid);

    assert_eq!(
        checkout.handle_event(&event).await.unwrap(),
        WebhookOutcome::CartCleared {
            user_id: customer.id,
            cleared_lines: 1
        }
    );
    assert_eq!(shop.cart_len(customer.id), 0);
    assert_eq!(
        shop.status(&created.session_id),
        Some(CheckoutStatus::Completed)
    );

    // Redelivery
    assert_eq!(
        checkout.handle_event(&event).await.unwrap(),
        WebhookOutcome::CartCleared {
            user_id: customer.id,
            cleared_lines: 0
        }
    );
}

#[tokio::test]
async fn test_success_page_after_webhook_is_a_no_op() {
    let (shop, customer) = MemoryShop::with_user(7, "marie@boutique.test");
    let stripe = MemoryStripe::default();
    let checkout = CheckoutService::new(&shop, &stripe, CurrencyCode::EUR);

    let scarf = shop.list(1, "Wool scarf", "9.99");
    shop.add_to_cart(customer.id, scarf, 3);
    let created = checkout.create_session(&customer, RETURN_URL).await.unwrap();
    stripe.pay(&created.session_id);

    let paid = stripe
        .retrieve_checkout_session(&created.session_id)
        .await
        .unwrap();
    checkout
        .handle_event(&delivered("checkout.session.completed", &paid))
        .await
        .unwrap();

    let outcome = checkout
        .clear_after_success(customer.id, &created.session_id)
        .await
        .unwrap();
    assert!(outcome.session.is_complete());
    assert_eq!(outcome.cleared_lines, 0);

    let record = outcome.record.unwrap();
    assert_eq!(record.status, CheckoutStatus::Completed);
    assert!(record.completed_at.is_some());
    assert_eq!(record.snapshot.total_quantity(), 3);
    assert_eq!(record.amount_total, 2997);
}

#[tokio::test]
async fn test_unlisted_product_is_pruned_before_payment() {
    let (shop, customer) = MemoryShop::with_user(7, "marie@boutique.test");
    let stripe = MemoryStripe::default();
    let checkout = CheckoutService::new(&shop, &stripe, CurrencyCode::EUR);

    let scarf = shop.list(1, "Wool scarf", "9.99");
    let hat = shop.list(2, "Felt hat", "35.00");
    shop.add_to_cart(customer.id, scarf, 1);
    shop.add_to_cart(customer.id, hat, 1);
    shop.unlist(hat);

    let created = checkout.create_session(&customer, RETURN_URL).await.unwrap();

    let requests = stripe.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let names: Vec<&str> = requests[0]
        .line_items
        .iter()
        .map(|item| item.name.as_str())
        .collect();
    assert_eq!(names, ["Wool scarf"]);
    assert_eq!(created.snapshot.total_amount(), 999);
    assert_eq!(shop.cart_len(customer.id), 1);
}

#[tokio::test]
async fn test_cart_of_only_unlisted_products_never_reaches_stripe() {
    let (shop, customer) = MemoryShop::with_user(7, "marie@boutique.test");
    let stripe = MemoryStripe::default();
    let checkout = CheckoutService::new(&shop, &stripe, CurrencyCode::EUR);

    let hat = shop.list(2, "Felt hat", "35.00");
    shop.add_to_cart(customer.id, hat, 1);
    shop.unlist(hat);

    let result = checkout.create_session(&customer, RETURN_URL).await;

    assert!(matches!(result, Err(CheckoutError::EmptyCart)));
    assert!(stripe.requests.lock().unwrap().is_empty());
    assert_eq!(shop.cart_len(customer.id), 0);
}

#[tokio::test]
async fn test_expiry_after_payment_is_refused() {
    let (shop, customer) = MemoryShop::with_user(7, "marie@boutique.test");
    let stripe = MemoryStripe::default();
    let checkout = CheckoutService::new(&shop, &stripe, CurrencyCode::EUR);

    let scarf = shop.list(1, "Wool scarf", "9.99");
    shop.add_to_cart(customer.id, scarf, 1);
    let created = checkout.create_session(&customer, RETURN_URL).await.unwrap();
    stripe.pay(&created.session_id);
    let paid = stripe
        .retrieve_checkout_session(&created.session_id)
        .await
        .unwrap();

    checkout
        .handle_event(&delivered("checkout.session.completed", &paid))
        .await
        .unwrap();
    let late = checkout
        .handle_event(&delivered("checkout.session.expired", &paid))
        .await
        .unwrap();

    assert_eq!(
        late,
        WebhookOutcome::SessionClosed(StatusTransition::Refused(CheckoutStatus::Completed))
    );
    assert_eq!(
        shop.status(&created.session_id),
        Some(CheckoutStatus::Completed)
    );
}

#[tokio::test]
async fn test_completion_for_unknown_user_keeps_other_carts() {
    let (shop, customer) = MemoryShop::with_user(7, "marie@boutique.test");
    let stripe = MemoryStripe::default();
    let checkout = CheckoutService::new(&shop, &stripe, CurrencyCode::EUR);

    let scarf = shop.list(1, "Wool scarf", "9.99");
    shop.add_to_cart(customer.id, scarf, 1);

    let stranger: CheckoutSession = serde_json::from_value(json!({
        "id": "cs_test_stranger",
        "status": "complete",
        "payment_status": "paid",
        "metadata": { "user_id": "999" }
    }))
    .unwrap();
    let outcome = checkout
        .handle_event(&delivered("checkout.session.completed", &stranger))
        .await
        .unwrap();

    assert_eq!(outcome, WebhookOutcome::UserNotFound);
    assert_eq!(shop.cart_len(customer.id), 1);
}
