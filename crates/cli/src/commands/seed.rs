//! Seed the catalog from a YAML file.
//!
//! The file is a list of products:
//!
//! ```yaml
//! - title: Linen shirt
//!   description: Washed linen, relaxed fit.
//!   price: 49.90
//!   image_url: https://images.example.com/linen-shirt.jpg
//! ```
//!
//! Every entry is validated with the same rules as the product form before
//! anything is inserted.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use boutique_core::Email;
use boutique_storefront::db::{ProductRepository, UserRepository};
use boutique_storefront::models::ProductDraft;

use super::{CommandError, connect, currency};

#[derive(Debug, Deserialize)]
struct SeedProduct {
    title: String,
    description: String,
    price: SeedPrice,
    image_url: String,
}

/// YAML reads `49.90` as a number and `"49,90"` as a string; accept both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedPrice {
    Text(String),
    Number(f64),
}

impl SeedPrice {
    fn as_input(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(number) => number.to_string(),
        }
    }
}

/// Insert the products listed in `file_path`, owned by `owner_email`.
pub async fn products(file_path: &str, owner_email: &str) -> Result<(), CommandError> {
    let currency = currency()?;

    info!(path = %file_path, "Loading products from file");
    let content = tokio::fs::read_to_string(Path::new(file_path))
        .await
        .map_err(|source| CommandError::File {
            path: file_path.to_owned(),
            source,
        })?;
    let entries: Vec<SeedProduct> = serde_yaml::from_str(&content)?;
    info!(products = entries.len(), "Parsed file");

    let drafts = validate(&entries, currency)?;

    let pool = connect().await?;
    let owner = match Email::parse(owner_email) {
        Ok(email) => UserRepository::new(&pool).get_by_email(&email).await?,
        Err(_) => None,
    }
    .ok_or_else(|| CommandError::UnknownUser(owner_email.to_owned()))?;

    let products = ProductRepository::new(&pool, currency);
    for draft in &drafts {
        let product = products.create(owner.id, draft).await?;
        info!("  #{} {} ({})", product.id, product.title, product.price);
    }

    info!("Seeding complete! {} product(s) owned by {}", drafts.len(), owner.email);
    Ok(())
}

fn validate(
    entries: &[SeedProduct],
    currency: boutique_core::CurrencyCode,
) -> Result<Vec<ProductDraft>, CommandError> {
    let mut drafts = Vec::with_capacity(entries.len());
    let mut invalid = 0;

    for (index, entry) in entries.iter().enumerate() {
        match ProductDraft::parse(
            &entry.title,
            &entry.description,
            &entry.price.as_input(),
            &entry.image_url,
            currency,
        ) {
            Ok(draft) => drafts.push(draft),
            Err(errors) => {
                invalid += 1;
                error!("Entry {} ({}):", index + 1, entry.title);
                for message in errors.0 {
                    error!("  - {message}");
                }
            }
        }
    }

    if invalid > 0 {
        return Err(CommandError::InvalidProducts(invalid));
    }
    Ok(drafts)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boutique_core::CurrencyCode;

    use super::*;

    const FILE: &str = r#"
- title: Linen shirt
  description: Washed linen, relaxed fit.
  price: 49.90
  image_url: https://images.example.com/linen-shirt.jpg
- title: Wool scarf
  description: Merino, hand finished.
  price: "19,50"
  image_url: https://images.example.com/scarf.jpg
"#;

    #[test]
    fn test_accepts_numeric_and_text_prices() {
        let entries: Vec<SeedProduct> = serde_yaml::from_str(FILE).unwrap();
        let drafts = validate(&entries, CurrencyCode::EUR).unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].price.to_minor_units().unwrap(), 4990);
        assert_eq!(drafts[1].price.to_minor_units().unwrap(), 1950);
    }

    #[test]
    fn test_rejects_whole_file_on_invalid_entry() {
        let file = r"
- title: Ok
  description: short
  price: 0
  image_url: not-a-url
";
        let entries: Vec<SeedProduct> = serde_yaml::from_str(file).unwrap();
        assert!(matches!(
            validate(&entries, CurrencyCode::EUR),
            Err(CommandError::InvalidProducts(1))
        ));
    }
}
