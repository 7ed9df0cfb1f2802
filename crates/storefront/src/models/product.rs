//! Catalog product types and form validation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use boutique_core::{CurrencyCode, Price, ProductId, UserId};

const MIN_TITLE_CHARS: usize = 3;
const MIN_DESCRIPTION_CHARS: usize = 5;

/// A catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    /// User who listed the product; only they may edit or delete it.
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub price: Price,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }
}

/// Validation failures for a submitted product, one message per field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid product: {}", .0.join("; "))]
pub struct ProductValidationError(pub Vec<String>);

/// A validated product ready to be inserted or written over an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub title: String,
    pub description: String,
    pub price: Price,
    pub image_url: String,
}

impl ProductDraft {
    /// Validate raw form or JSON input.
    ///
    /// Rules: title at least 3 characters, description at least 5, a
    /// strictly positive price, and an absolute http(s) image URL.
    ///
    /// # Errors
    ///
    /// Returns every failed rule at once so forms can show them together.
    pub fn parse(
        title: &str,
        description: &str,
        price: &str,
        image_url: &str,
        currency: CurrencyCode,
    ) -> Result<Self, ProductValidationError> {
        let mut errors = Vec::new();

        let title = title.trim();
        if title.chars().count() < MIN_TITLE_CHARS {
            errors.push(format!("Title must be at least {MIN_TITLE_CHARS} characters"));
        }

        let description = description.trim();
        if description.chars().count() < MIN_DESCRIPTION_CHARS {
            errors.push(format!(
                "Description must be at least {MIN_DESCRIPTION_CHARS} characters"
            ));
        }

        let price = match Price::parse(price, currency) {
            Ok(price) if !price.amount.is_zero() => Some(price),
            _ => {
                errors.push("Price must be a positive number".to_string());
                None
            }
        };

        let image_url = image_url.trim();
        let url_ok = Url::parse(image_url)
            .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host());
        if !url_ok {
            errors.push("Image URL must be a valid http(s) URL".to_string());
        }

        match price {
            Some(price) if errors.is_empty() => Ok(Self {
                title: title.to_string(),
                description: description.to_string(),
                price,
                image_url: image_url.to_string(),
            }),
            _ => Err(ProductValidationError(errors)),
        }
    }
}
