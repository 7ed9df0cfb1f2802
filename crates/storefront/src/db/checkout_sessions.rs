//! Checkout session ledger.
//!
//! Records each Stripe session with the line items it was created from and
//! tracks its status as webhook events arrive.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use boutique_core::{CheckoutStatus, CurrencyCode, UserId};

use super::RepositoryError;
use crate::models::checkout::{
    CheckoutSessionRecord, CheckoutSnapshot, LineItemSnapshot, NewCheckoutSession,
    StatusTransition,
};

#[derive(Debug, sqlx::FromRow)]
struct CheckoutSessionRow {
    id: String,
    user_id: i32,
    correlation_id: String,
    status: String,
    line_items: serde_json::Value,
    currency: String,
    amount_total: i64,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<CheckoutSessionRow> for CheckoutSessionRecord {
    type Error = RepositoryError;

    fn try_from(row: CheckoutSessionRow) -> Result<Self, Self::Error> {
        let corrupt = |what: String| {
            RepositoryError::DataCorruption(format!("checkout session {}: {what}", row.id))
        };

        let status = row.status.parse::<CheckoutStatus>().map_err(&corrupt)?;
        let currency = row.currency.parse::<CurrencyCode>().map_err(&corrupt)?;
        let line_items: Vec<LineItemSnapshot> = serde_json::from_value(row.line_items.clone())
            .map_err(|e| corrupt(format!("line items: {e}")))?;

        Ok(Self {
            user_id: UserId::new(row.user_id),
            correlation_id: row.correlation_id,
            status,
            snapshot: CheckoutSnapshot {
                currency,
                line_items,
            },
            amount_total: row.amount_total,
            created_at: row.created_at,
            completed_at: row.completed_at,
            id: row.id,
        })
    }
}

/// Repository for recorded checkout sessions.
pub struct CheckoutSessionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutSessionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a freshly created session as `open`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the session id was already recorded.
    pub async fn record(&self, session: &NewCheckoutSession) -> Result<(), RepositoryError> {
        let line_items = serde_json::to_value(&session.snapshot.line_items)
            .map_err(|e| RepositoryError::DataCorruption(format!("line items: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO shop.checkout_session
                (id, user_id, correlation_id, status, line_items, currency, amount_total)
            VALUES ($1, $2, $3, 'open', $4, $5, $6)
            ",
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(&session.correlation_id)
        .bind(line_items)
        .bind(session.snapshot.currency.stripe_code())
        .bind(session.snapshot.total_amount())
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "checkout session already recorded"))?;

        Ok(())
    }

    /// Get a recorded session by its provider id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: &str) -> Result<Option<CheckoutSessionRecord>, RepositoryError> {
        sqlx::query_as::<_, CheckoutSessionRow>(
            r"
            SELECT id, user_id, correlation_id, status, line_items, currency,
                   amount_total, created_at, completed_at
            FROM shop.checkout_session
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .map(CheckoutSessionRecord::try_from)
        .transpose()
    }

    /// Most recent sessions of a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_for_user(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<CheckoutSessionRecord>, RepositoryError> {
        sqlx::query_as::<_, CheckoutSessionRow>(
            r"
            SELECT id, user_id, correlation_id, status, line_items, currency,
                   amount_total, created_at, completed_at
            FROM shop.checkout_session
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            ",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(CheckoutSessionRecord::try_from)
        .collect()
    }

    /// Move a session to `next` if that is a forward transition.
    ///
    /// The row is locked for the duration of the check so concurrent
    /// deliveries of the same event serialize here.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn transition(
        &self,
        id: &str,
        next: CheckoutStatus,
    ) -> Result<StatusTransition, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<String> = sqlx::query_scalar(
            "SELECT status FROM shop.checkout_session WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            return Ok(StatusTransition::Unknown);
        };
        let current = current.parse::<CheckoutStatus>().map_err(|e| {
            RepositoryError::DataCorruption(format!("checkout session {id}: {e}"))
        })?;

        if current == next {
            return Ok(StatusTransition::Unchanged);
        }
        if !current.can_transition_to(next) {
            return Ok(StatusTransition::Refused(current));
        }

        sqlx::query(
            r"
            UPDATE shop.checkout_session
            SET status = $2::TEXT,
                completed_at = CASE WHEN $2::TEXT = 'completed' THEN NOW() ELSE completed_at END
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(next.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(StatusTransition::Applied)
    }
}
