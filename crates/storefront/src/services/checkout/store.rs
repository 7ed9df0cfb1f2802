//! Persistence seams used by the checkout flow.
//!
//! The traits keep [`super::CheckoutService`] and [`super::CartReconciler`]
//! independent of `PostgreSQL`; [`PgCheckoutStore`] is the production
//! implementation and tests substitute in-memory fakes.

#![allow(async_fn_in_trait)]

use sqlx::PgPool;

use boutique_core::{CheckoutStatus, ProductId, UserId};

use crate::db::{CartRepository, CheckoutSessionRepository, RepositoryError, UserRepository};
use crate::models::cart::CartLine;
use crate::models::checkout::{CheckoutSessionRecord, NewCheckoutSession, StatusTransition};
use crate::models::user::User;

/// Cart aggregate operations needed by the reconciler.
pub trait CartStore: Send + Sync {
    /// Every stored line of a user's cart, with its product when it exists.
    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError>;

    /// Delete exactly these products' lines. Returns the number removed.
    async fn remove_products(
        &self,
        user_id: UserId,
        product_ids: &[ProductId],
    ) -> Result<u64, RepositoryError>;

    /// Delete every line. Clearing an empty cart returns `Ok(0)`.
    async fn clear_cart(&self, user_id: UserId) -> Result<u64, RepositoryError>;
}

/// Everything the checkout session manager reads or writes.
pub trait CheckoutStore: CartStore {
    async fn find_user(&self, user_id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn record_session(&self, session: &NewCheckoutSession) -> Result<(), RepositoryError>;

    /// The session as recorded when it was created, with its frozen snapshot.
    async fn find_session(
        &self,
        session_id: &str,
    ) -> Result<Option<CheckoutSessionRecord>, RepositoryError>;

    async fn transition_session(
        &self,
        session_id: &str,
        next: CheckoutStatus,
    ) -> Result<StatusTransition, RepositoryError>;
}

/// `PostgreSQL`-backed store.
#[derive(Clone, Copy)]
pub struct PgCheckoutStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgCheckoutStore<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl CartStore for PgCheckoutStore<'_> {
    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        CartRepository::new(self.pool).lines(user_id).await
    }

    async fn remove_products(
        &self,
        user_id: UserId,
        product_ids: &[ProductId],
    ) -> Result<u64, RepositoryError> {
        CartRepository::new(self.pool)
            .remove_products(user_id, product_ids)
            .await
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        CartRepository::new(self.pool).clear(user_id).await
    }
}

impl CheckoutStore for PgCheckoutStore<'_> {
    async fn find_user(&self, user_id: UserId) -> Result<Option<User>, RepositoryError> {
        UserRepository::new(self.pool).get_by_id(user_id).await
    }

    async fn record_session(&self, session: &NewCheckoutSession) -> Result<(), RepositoryError> {
        CheckoutSessionRepository::new(self.pool).record(session).await
    }

    async fn find_session(
        &self,
        session_id: &str,
    ) -> Result<Option<CheckoutSessionRecord>, RepositoryError> {
        CheckoutSessionRepository::new(self.pool).get(session_id).await
    }

    async fn transition_session(
        &self,
        session_id: &str,
        next: CheckoutStatus,
    ) -> Result<StatusTransition, RepositoryError> {
        CheckoutSessionRepository::new(self.pool)
            .transition(session_id, next)
            .await
    }
}
