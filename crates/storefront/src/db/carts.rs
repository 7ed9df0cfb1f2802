//! Cart repository.
//!
//! Every mutation is a single statement against `shop.cart_item`, so two
//! requests touching the same cart never overwrite each other's lines.

use rust_decimal::Decimal;
use sqlx::PgPool;

use boutique_core::{ProductId, Quantity, UserId};

use super::RepositoryError;
use crate::models::cart::{CartLine, CartProduct};

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    product_id: i32,
    quantity: i32,
    joined_id: Option<i32>,
    title: Option<String>,
    description: Option<String>,
    price: Option<Decimal>,
    image_url: Option<String>,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let quantity = Quantity::new(row.quantity).map_err(|e| {
            RepositoryError::DataCorruption(format!("cart line {}: {e}", row.product_id))
        })?;

        let product = match (row.joined_id, row.price) {
            (Some(_), Some(price)) => Some(CartProduct {
                title: row.title.unwrap_or_default(),
                description: row.description.unwrap_or_default(),
                price,
                image_url: row.image_url.unwrap_or_default(),
            }),
            _ => None,
        };

        Ok(Self {
            product_id: ProductId::new(row.product_id),
            quantity,
            product,
        })
    }
}

/// Repository for the per-user cart aggregate.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All lines of a user's cart joined with their products, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT ci.product_id, ci.quantity,
                   p.id AS joined_id, p.title, p.description, p.price, p.image_url
            FROM shop.cart_item ci
            LEFT JOIN shop.product p ON p.id = ci.product_id
            WHERE ci.user_id = $1
            ORDER BY ci.added_at, ci.product_id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(CartLine::try_from)
        .collect()
    }

    /// Add `quantity` units of a product, merging into an existing line.
    ///
    /// Returns the line's quantity after the merge. The sum saturates at
    /// `i32::MAX`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Quantity, RepositoryError> {
        let merged: i32 = sqlx::query_scalar(
            r"
            INSERT INTO shop.cart_item (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id) DO UPDATE
            SET quantity = LEAST(
                shop.cart_item.quantity::BIGINT + EXCLUDED.quantity,
                2147483647
            )::INTEGER
            RETURNING quantity
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity.get())
        .fetch_one(self.pool)
        .await?;

        Quantity::new(merged)
            .map_err(|e| RepositoryError::DataCorruption(format!("merged cart line: {e}")))
    }

    /// Remove one product's line. Returns whether a line existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM shop.cart_item WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove exactly the given products' lines, leaving the rest untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove_products(
        &self,
        user_id: UserId,
        product_ids: &[ProductId],
    ) -> Result<u64, RepositoryError> {
        if product_ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<i32> = product_ids.iter().map(ProductId::as_i32).collect();

        let result = sqlx::query(
            "DELETE FROM shop.cart_item WHERE user_id = $1 AND product_id = ANY($2)",
        )
        .bind(user_id)
        .bind(ids)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete every line of a user's cart. Clearing an empty cart is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
