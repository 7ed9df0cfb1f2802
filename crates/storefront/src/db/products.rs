//! Product catalog repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use boutique_core::{CurrencyCode, Price, ProductId, UserId};

use super::RepositoryError;
use crate::models::product::{Product, ProductDraft};

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    user_id: i32,
    title: String,
    description: String,
    price: Decimal,
    image_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self, currency: CurrencyCode) -> Result<Product, RepositoryError> {
        let price = Price::new(self.price, currency).map_err(|e| {
            RepositoryError::DataCorruption(format!("product {} has invalid price: {e}", self.id))
        })?;

        Ok(Product {
            id: ProductId::new(self.id),
            owner_id: UserId::new(self.user_id),
            title: self.title,
            description: self.description,
            price,
            image_url: self.image_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for catalog products.
///
/// Prices are stored without a currency; every product is sold in the
/// shop-wide checkout currency passed to [`ProductRepository::new`].
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
    currency: CurrencyCode,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, currency: CurrencyCode) -> Self {
        Self { pool, currency }
    }

    /// List every product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, user_id, title, description, price, image_url, created_at, updated_at
            FROM shop.product
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(|row| row.into_product(self.currency))
        .collect()
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, user_id, title, description, price, image_url, created_at, updated_at
            FROM shop.product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .map(|row| row.into_product(self.currency))
        .transpose()
    }

    /// Insert a new product owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        owner: UserId,
        draft: &ProductDraft,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO shop.product (user_id, title, description, price, image_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, title, description, price, image_url, created_at, updated_at
            ",
        )
        .bind(owner)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.price.amount)
        .bind(&draft.image_url)
        .fetch_one(self.pool)
        .await?
        .into_product(self.currency)
    }

    /// Overwrite a product owned by `owner`.
    ///
    /// Carts referencing the product see the new values on their next read;
    /// checkout sessions already created keep their frozen line items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product with this id is owned by `owner`.
    pub async fn update(
        &self,
        id: ProductId,
        owner: UserId,
        draft: &ProductDraft,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(
            r"
            UPDATE shop.product
            SET title = $3, description = $4, price = $5, image_url = $6, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, description, price, image_url, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(owner)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.price.amount)
        .bind(&draft.image_url)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?
        .into_product(self.currency)
    }

    /// Delete a product owned by `owner`.
    ///
    /// Cart lines pointing at it are left in place and pruned by the
    /// reconciler.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product with this id is owned by `owner`.
    pub async fn delete(&self, id: ProductId, owner: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.product WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
