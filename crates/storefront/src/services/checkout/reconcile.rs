//! Cart reconciliation.
//!
//! Products can be deleted or edited into an unsellable state while carts
//! still point at them. Before a cart is shown or priced, every line is
//! resolved against the live catalog and unresolvable lines are pruned from
//! storage.

use tracing::{instrument, warn};

use boutique_core::{CurrencyCode, ProductId, UserId};

use super::error::CheckoutError;
use super::store::CartStore;
use crate::models::cart::PricedCartItem;

/// Prunes a cart down to lines that can be sold.
pub struct CartReconciler<'a, S> {
    store: &'a S,
    currency: CurrencyCode,
}

impl<'a, S: CartStore> CartReconciler<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, currency: CurrencyCode) -> Self {
        Self { store, currency }
    }

    /// Return the user's sellable cart lines, deleting the rest from storage.
    ///
    /// Storage is only written when at least one line was dropped, and only
    /// the dropped product ids are deleted.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Store` if the cart cannot be read or pruned.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn reconcile(&self, user_id: UserId) -> Result<Vec<PricedCartItem>, CheckoutError> {
        let lines = self.store.cart_lines(user_id).await?;

        let mut items = Vec::with_capacity(lines.len());
        let mut dropped: Vec<ProductId> = Vec::new();

        for line in &lines {
            match line.price(self.currency) {
                Ok(item) => items.push(item),
                Err(reason) => {
                    warn!(
                        product_id = %line.product_id,
                        reason = reason.as_str(),
                        "Dropping unsellable cart line"
                    );
                    dropped.push(line.product_id);
                }
            }
        }

        if !dropped.is_empty() {
            self.store.remove_products(user_id, &dropped).await?;
        }

        Ok(items)
    }
}
