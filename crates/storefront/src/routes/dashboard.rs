//! Dashboard: the catalog next to the user's reconciled cart.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::Redirect,
};
use tracing::instrument;

use super::MessageQuery;
use crate::db::ProductRepository;
use crate::error::Result;
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::cart::{cart_total, item_count};
use crate::models::{CurrentUser, PricedCartItem, Product};
use crate::state::AppState;

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub user: CurrentUser,
    pub products: Vec<Product>,
    pub cart: Vec<PricedCartItem>,
    pub cart_total: String,
    pub cart_count: i64,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// `/` sends visitors to the dashboard or the login page.
pub async fn root(OptionalAuth(user): OptionalAuth) -> Redirect {
    if user.is_some() {
        Redirect::to("/dashboard")
    } else {
        Redirect::to("/login")
    }
}

/// Display the dashboard.
///
/// Loading the page reconciles the cart, so lines pointing at deleted
/// products disappear here before checkout ever sees them.
#[instrument(skip(state, user, query), fields(user_id = %user.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<DashboardTemplate> {
    let currency = state.config().stripe.currency;
    let products = ProductRepository::new(state.pool(), currency)
        .list_all()
        .await?;

    let store = state.checkout_store();
    let cart = state.checkout(&store).reconcile_cart(user.id).await?;

    Ok(DashboardTemplate {
        cart_total: cart_total(&cart, currency).display(),
        cart_count: item_count(&cart),
        user,
        products,
        cart,
        error: query.error_text(),
        success: query.success_text(),
    })
}
