//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Redirect to /dashboard or /login
//!
//! # Auth
//! GET  /signup, POST /signup      - Register
//! GET  /login,  POST /login       - Password login
//! GET  /logout, POST /logout      - Destroy session
//! GET  /reset,  POST /reset       - Request a password reset email
//! GET  /reset/{token}             - New password form
//! POST /new-password              - Set new password
//!
//! # Shop (requires auth)
//! GET  /dashboard                 - Catalog and reconciled cart
//! GET  /add-product, POST /add-product
//! GET  /edit-product/{id}, POST /edit-product/{id}   - Owner only
//! POST /delete-product/{id}                          - Owner only
//! POST /add-to-cart               - Merge quantity into the cart
//! POST /remove-from-cart          - Drop one product from the cart
//!
//! # Checkout (requires auth)
//! POST /create-checkout-session   - Embedded checkout page
//! GET  /session-status            - JSON status of a session
//! GET  /success                   - Payment result, defensive cart clear
//! GET  /cancel                    - Checkout abandoned
//!
//! # Stripe
//! POST /webhook                   - Signed event delivery (raw body)
//!
//! # JSON API
//! GET  /api/products              - Catalog
//! GET  /api/cart                  - Caller's reconciled cart (auth)
//! ```

pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod dashboard;
pub mod products;
pub mod webhook;

use axum::{
    Router,
    routing::{get, post},
};
use serde::Deserialize;

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Signup, login and password reset, behind the strict rate limiter.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/reset", get(auth::reset_page).post(auth::request_reset))
        .route("/reset/{token}", get(auth::new_password_page))
        .route("/new-password", post(auth::new_password))
        .layer(auth_rate_limiter())
}

/// Catalog management and cart mutation.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::root))
        .route("/dashboard", get(dashboard::dashboard))
        .route(
            "/add-product",
            get(products::add_product_page).post(products::add_product),
        )
        .route(
            "/edit-product/{id}",
            get(products::edit_product_page).post(products::edit_product),
        )
        .route("/delete-product/{id}", post(products::delete_product))
        .route("/add-to-cart", post(cart::add_to_cart))
        .route("/remove-from-cart", post(cart::remove_from_cart))
        .route("/logout", get(auth::logout).post(auth::logout))
}

/// Stripe embedded checkout and its webhook.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/create-checkout-session",
            post(checkout::create_checkout_session),
        )
        .route("/session-status", get(checkout::session_status))
        .route("/success", get(checkout::success))
        .route("/cancel", get(checkout::cancel))
        .route("/webhook", post(webhook::webhook))
}

/// JSON API.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(api::products))
        .route("/cart", get(api::cart))
        .layer(api_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(shop_routes())
        .merge(checkout_routes())
        .nest("/api", api_routes())
}

/// `?error=` / `?success=` codes set by redirects.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

impl MessageQuery {
    /// Display text for the error code, if any.
    #[must_use]
    pub fn error_text(&self) -> Option<String> {
        self.error.as_deref().map(|code| flash_message(code).to_string())
    }

    /// Display text for the success code, if any.
    #[must_use]
    pub fn success_text(&self) -> Option<String> {
        self.success.as_deref().map(|code| flash_message(code).to_string())
    }
}

/// Redirect target carrying a short error code, e.g. `/dashboard?error=empty_cart`.
pub(crate) fn with_error(path: &str, code: &str) -> String {
    format!("{path}?error={}", urlencoding::encode(code))
}

/// Redirect target carrying a success code.
pub(crate) fn with_success(path: &str, code: &str) -> String {
    format!("{path}?success={}", urlencoding::encode(code))
}

/// Human-readable text for the error and success codes used in redirects.
pub(crate) fn flash_message(code: &str) -> &'static str {
    match code {
        "credentials" => "Invalid email or password.",
        "email_taken" => "An account with this email already exists.",
        "invalid_email" => "Please enter a valid email address.",
        "password_mismatch" => "Passwords do not match.",
        "password_too_short" => "Password must be at least 8 characters.",
        "invalid_reset_link" => "This reset link is invalid or has expired.",
        "reset_sent" => "If an account exists for that address, a reset link is on its way.",
        "password_updated" => "Your password has been updated. Please log in.",
        "session" => "Your session could not be saved. Please try again.",
        "empty_cart" => "Your cart is empty.",
        "payment" => "Payment could not be started. Please try again.",
        "invalid_product" => "That product is no longer available.",
        "invalid_quantity" => "Quantity must be a positive number.",
        "not_owner" => "You can only change products you listed.",
        "product_saved" => "Product saved.",
        "product_deleted" => "Product deleted.",
        "added" => "Added to cart.",
        "removed" => "Removed from cart.",
        _ => "Something went wrong. Please try again.",
    }
}
