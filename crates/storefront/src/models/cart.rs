//! Cart aggregate types.
//!
//! A cart is stored as one `shop.cart_item` row per (user, product). Rows
//! carry no foreign key to `shop.product`, so a line may point at a product
//! that has since been deleted. [`CartLine`] is the raw stored form;
//! [`PricedCartItem`] only exists for lines that resolved to a sellable
//! product.

use rust_decimal::Decimal;
use serde::Serialize;

use boutique_core::{CurrencyCode, Price, ProductId, Quantity};

/// Product columns joined onto a cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartProduct {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: String,
}

/// A stored cart line, with its product if it still exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub product: Option<CartProduct>,
}

/// Why a cart line cannot be priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The product row no longer exists.
    Missing,
    /// The product has an empty or whitespace-only title.
    BlankTitle,
    /// The product price is below zero.
    NegativePrice,
}

impl DropReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::BlankTitle => "blank_title",
            Self::NegativePrice => "negative_price",
        }
    }
}

impl CartLine {
    /// Resolve this line into a priced item, or say why it cannot be sold.
    ///
    /// # Errors
    ///
    /// Returns the [`DropReason`] for dangling or malformed products.
    pub fn price(&self, currency: CurrencyCode) -> Result<PricedCartItem, DropReason> {
        let product = self.product.as_ref().ok_or(DropReason::Missing)?;
        if product.title.trim().is_empty() {
            return Err(DropReason::BlankTitle);
        }
        let unit_price =
            Price::new(product.price, currency).map_err(|_| DropReason::NegativePrice)?;

        Ok(PricedCartItem {
            product_id: self.product_id,
            title: product.title.clone(),
            description: product.description.clone(),
            image_url: product.image_url.clone(),
            unit_price,
            quantity: self.quantity,
        })
    }
}

/// A cart line whose product resolved to a valid catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedCartItem {
    pub product_id: ProductId,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub unit_price: Price,
    pub quantity: Quantity,
}

impl PricedCartItem {
    /// Unit price times quantity, in the standard currency unit.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.amount * Decimal::from(self.quantity.get())
    }

    /// Line total as a displayable price.
    #[must_use]
    pub fn line_price(&self) -> Price {
        Price {
            amount: self.line_total(),
            currency_code: self.unit_price.currency_code,
        }
    }
}

/// Sum of all line totals.
#[must_use]
pub fn cart_total(items: &[PricedCartItem], currency: CurrencyCode) -> Price {
    let amount = items.iter().map(PricedCartItem::line_total).sum();
    Price {
        amount,
        currency_code: currency,
    }
}

/// Total number of units across all lines.
#[must_use]
pub fn item_count(items: &[PricedCartItem]) -> i64 {
    items.iter().map(|item| i64::from(item.quantity.get())).sum()
}
