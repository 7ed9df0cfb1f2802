//! Checkout session snapshot and ledger types.
//!
//! A snapshot freezes what the customer is charged for at the moment the
//! payment session is created. It is stored as JSONB next to the session
//! record and never recomputed from the live catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use boutique_core::{CheckoutStatus, CurrencyCode, PriceError, ProductId, Quantity, UserId};

use super::cart::PricedCartItem;

/// One frozen line of a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemSnapshot {
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    /// Unit price in minor units (cents).
    pub unit_amount: i64,
    pub quantity: Quantity,
}

impl LineItemSnapshot {
    #[must_use]
    pub fn amount(&self) -> i64 {
        self.unit_amount.saturating_mul(i64::from(self.quantity.get()))
    }
}

/// Line items plus currency, as submitted to the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSnapshot {
    pub currency: CurrencyCode,
    pub line_items: Vec<LineItemSnapshot>,
}

impl CheckoutSnapshot {
    /// Freeze priced cart items into minor-unit line items.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Overflow`] if a unit price does not fit in `i64`.
    pub fn from_items(
        items: &[PricedCartItem],
        currency: CurrencyCode,
    ) -> Result<Self, PriceError> {
        let line_items = items
            .iter()
            .map(|item| {
                Ok(LineItemSnapshot {
                    product_id: item.product_id,
                    name: item.title.clone(),
                    description: item.description.clone(),
                    image_url: Some(item.image_url.clone()).filter(|url| !url.is_empty()),
                    unit_amount: item.unit_price.to_minor_units()?,
                    quantity: item.quantity,
                })
            })
            .collect::<Result<Vec<_>, PriceError>>()?;

        Ok(Self {
            currency,
            line_items,
        })
    }

    /// Amount charged, in minor units.
    #[must_use]
    pub fn total_amount(&self) -> i64 {
        self.line_items
            .iter()
            .map(LineItemSnapshot::amount)
            .fold(0, i64::saturating_add)
    }

    #[must_use]
    pub fn total_quantity(&self) -> i64 {
        self.line_items
            .iter()
            .map(|line| i64::from(line.quantity.get()))
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }
}

/// A session to record right after the provider created it.
#[derive(Debug, Clone)]
pub struct NewCheckoutSession {
    /// Provider session id (`cs_...`).
    pub id: String,
    pub user_id: UserId,
    /// Correlation id sent as `metadata[order_id]`.
    pub correlation_id: String,
    pub snapshot: CheckoutSnapshot,
}

/// A recorded checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionRecord {
    pub id: String,
    pub user_id: UserId,
    pub correlation_id: String,
    pub status: CheckoutStatus,
    pub snapshot: CheckoutSnapshot,
    pub amount_total: i64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Result of asking the ledger to move a session to a new status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    /// The status changed.
    Applied,
    /// The session was already in the requested status.
    Unchanged,
    /// The move would go backwards and was refused.
    Refused(CheckoutStatus),
    /// No session with that id was recorded.
    Unknown,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boutique_core::Price;

    use super::*;

    fn item(price: &str, quantity: i32) -> PricedCartItem {
        PricedCartItem {
            product_id: ProductId::new(1),
            title: "Widget".to_string(),
            description: "A sturdy widget".to_string(),
            image_url: String::new(),
            unit_price: Price::parse(price, CurrencyCode::EUR).unwrap(),
            quantity: Quantity::new(quantity).unwrap(),
        }
    }

    #[test]
    fn test_widget_example() {
        let snapshot = CheckoutSnapshot::from_items(&[item("9.99", 2)], CurrencyCode::EUR).unwrap();
        let line = &snapshot.line_items[0];
        assert_eq!(line.unit_amount, 999);
        assert_eq!(line.quantity.get(), 2);
        assert_eq!(line.image_url, None);
        assert_eq!(snapshot.total_amount(), 1998);
        assert_eq!(snapshot.total_quantity(), 2);
    }

    #[test]
    fn test_snapshot_survives_json() {
        let snapshot = CheckoutSnapshot::from_items(
            &[item("9.99", 2), item("0.5", 1)],
            CurrencyCode::EUR,
        )
        .unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();
        let back: CheckoutSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back.total_amount(), 2048);
    }
}
