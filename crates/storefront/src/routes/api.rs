//! JSON API.

use axum::{Json, extract::State};
use serde::Serialize;

use boutique_core::{CurrencyCode, ProductId};

use crate::db::ProductRepository;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::cart::{cart_total, item_count};
use crate::models::{PricedCartItem, Product};
use crate::state::AppState;

/// One catalog entry.
#[derive(Debug, Serialize)]
pub struct ProductJson {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    /// Decimal string in the standard unit, e.g. `"9.99"`.
    pub price: String,
    pub currency: CurrencyCode,
    pub image_url: String,
}

impl From<Product> for ProductJson {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            title: product.title,
            description: product.description,
            price: product.price.amount.round_dp(2).to_string(),
            currency: product.price.currency_code,
            image_url: product.image_url,
        }
    }
}

/// The caller's reconciled cart.
#[derive(Debug, Serialize)]
pub struct CartJson {
    pub items: Vec<PricedCartItem>,
    pub item_count: i64,
    pub total: String,
}

/// `GET /api/products`
pub async fn products(State(state): State<AppState>) -> Result<Json<Vec<ProductJson>>> {
    let products = ProductRepository::new(state.pool(), state.config().stripe.currency)
        .list_all()
        .await?;
    Ok(Json(products.into_iter().map(ProductJson::from).collect()))
}

/// `GET /api/cart`
pub async fn cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartJson>> {
    let store = state.checkout_store();
    let items = state.checkout(&store).reconcile_cart(user.id).await?;
    let total = cart_total(&items, state.config().stripe.currency);

    Ok(Json(CartJson {
        item_count: item_count(&items),
        total: total.amount.round_dp(2).to_string(),
        items,
    }))
}
