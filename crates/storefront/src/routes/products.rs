//! Product management: list, edit and delete catalog entries.
//!
//! Any logged-in user may list a product; only its owner may change it.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{info, instrument};

use boutique_core::ProductId;

use super::{with_error, with_success};
use crate::db::{ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Product, ProductDraft};
use crate::state::AppState;

/// Product form data (add and edit).
#[derive(Debug, Default, Deserialize)]
pub struct ProductForm {
    pub title: String,
    pub description: String,
    pub price: String,
    pub image_url: String,
}

impl From<&Product> for ProductForm {
    fn from(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price.amount.to_string(),
            image_url: product.image_url.clone(),
        }
    }
}

/// Add/edit product page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub user: CurrentUser,
    pub heading: &'static str,
    pub action: String,
    pub form: ProductForm,
    pub errors: Vec<String>,
}

impl ProductForm {
    fn draft(&self, state: &AppState) -> std::result::Result<ProductDraft, Vec<String>> {
        ProductDraft::parse(
            &self.title,
            &self.description,
            &self.price,
            &self.image_url,
            state.config().stripe.currency,
        )
        .map_err(|e| e.0)
    }
}

fn parse_id(raw: &str) -> Result<ProductId> {
    ProductId::parse(raw).ok_or_else(|| AppError::NotFound(format!("product {raw}")))
}

/// Display the empty product form.
pub async fn add_product_page(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    ProductFormTemplate {
        user,
        heading: "Add a product",
        action: "/add-product".to_string(),
        form: ProductForm::default(),
        errors: Vec::new(),
    }
}

/// Create a product owned by the current user.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn add_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let draft = match form.draft(&state) {
        Ok(draft) => draft,
        Err(errors) => {
            return Ok(ProductFormTemplate {
                user,
                heading: "Add a product",
                action: "/add-product".to_string(),
                form,
                errors,
            }
            .into_response());
        }
    };

    let product = ProductRepository::new(state.pool(), state.config().stripe.currency)
        .create(user.id, &draft)
        .await?;
    info!(product_id = %product.id, "Product created");

    Ok(Redirect::to(&with_success("/dashboard", "product_saved")).into_response())
}

/// Display the edit form for a product the user owns.
pub async fn edit_product_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_id(&id)?;
    let product = ProductRepository::new(state.pool(), state.config().stripe.currency)
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    if !product.is_owned_by(user.id) {
        return Ok(Redirect::to(&with_error("/dashboard", "not_owner")).into_response());
    }

    Ok(ProductFormTemplate {
        user,
        heading: "Edit product",
        action: format!("/edit-product/{id}"),
        form: ProductForm::from(&product),
        errors: Vec::new(),
    }
    .into_response())
}

/// Update a product the user owns.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn edit_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let id = parse_id(&id)?;
    let draft = match form.draft(&state) {
        Ok(draft) => draft,
        Err(errors) => {
            return Ok(ProductFormTemplate {
                user,
                heading: "Edit product",
                action: format!("/edit-product/{id}"),
                form,
                errors,
            }
            .into_response());
        }
    };

    match ProductRepository::new(state.pool(), state.config().stripe.currency)
        .update(id, user.id, &draft)
        .await
    {
        Ok(_) => {
            info!(product_id = %id, "Product updated");
            Ok(Redirect::to(&with_success("/dashboard", "product_saved")).into_response())
        }
        Err(RepositoryError::NotFound) => {
            Ok(Redirect::to(&with_error("/dashboard", "not_owner")).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete a product the user owns.
///
/// Carts that still reference it are pruned the next time they are
/// reconciled.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let id = parse_id(&id)?;

    match ProductRepository::new(state.pool(), state.config().stripe.currency)
        .delete(id, user.id)
        .await
    {
        Ok(()) => {
            info!(product_id = %id, "Product deleted");
            Ok(Redirect::to(&with_success("/dashboard", "product_deleted")))
        }
        Err(RepositoryError::NotFound) => Ok(Redirect::to(&with_error("/dashboard", "not_owner"))),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert!(matches!(parse_id("abc"), Err(AppError::NotFound(_))));
        assert!(matches!(parse_id("0"), Err(AppError::NotFound(_))));
        assert_eq!(parse_id("12").ok(), Some(ProductId::new(12)));
    }
}
