//! Cart route handlers.
//!
//! Carts live in `shop.cart_item`, one row per product. Adds merge into the
//! existing row in a single statement, so two tabs adding the same product
//! never lose a unit.

use axum::{Form, extract::State, response::Redirect};
use serde::Deserialize;
use tracing::{info, instrument};

use boutique_core::{ProductId, Quantity};

use super::{with_error, with_success};
use crate::db::{CartRepository, ProductRepository};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<String>,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

/// Blank means one; anything else must be a positive integer.
fn parse_quantity(raw: Option<&str>) -> Option<Quantity> {
    match raw.map(str::trim) {
        None | Some("") => Some(Quantity::ONE),
        Some(value) => value
            .parse::<i64>()
            .ok()
            .and_then(|n| Quantity::try_from(n).ok()),
    }
}

/// Add a product to the cart, merging with an existing line.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Redirect> {
    let Some(product_id) = ProductId::parse(&form.product_id) else {
        return Ok(Redirect::to(&with_error("/dashboard", "invalid_product")));
    };
    let Some(quantity) = parse_quantity(form.quantity.as_deref()) else {
        return Ok(Redirect::to(&with_error("/dashboard", "invalid_quantity")));
    };

    let exists = ProductRepository::new(state.pool(), state.config().stripe.currency)
        .get_by_id(product_id)
        .await?
        .is_some();
    if !exists {
        return Ok(Redirect::to(&with_error("/dashboard", "invalid_product")));
    }

    let merged = CartRepository::new(state.pool())
        .add_item(user.id, product_id, quantity)
        .await?;
    info!(product_id = %product_id, quantity = merged.get(), "Added to cart");

    Ok(Redirect::to(&with_success("/dashboard", "added")))
}

/// Remove a product's line from the cart. Removing an absent line is a no-op.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Redirect> {
    let Some(product_id) = ProductId::parse(&form.product_id) else {
        return Ok(Redirect::to(&with_error("/dashboard", "invalid_product")));
    };

    CartRepository::new(state.pool())
        .remove_item(user.id, product_id)
        .await?;

    Ok(Redirect::to(&with_success("/dashboard", "removed")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(None), Some(Quantity::ONE));
        assert_eq!(parse_quantity(Some("  ")), Some(Quantity::ONE));
        assert_eq!(parse_quantity(Some("3")).map(Quantity::get), Some(3));
        assert_eq!(parse_quantity(Some("0")), None);
        assert_eq!(parse_quantity(Some("-2")), None);
        assert_eq!(parse_quantity(Some("two")), None);
        assert_eq!(parse_quantity(Some("99999999999")), None);
    }
}
