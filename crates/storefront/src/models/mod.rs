//! Domain models for the storefront.
//!
//! These types are validated domain objects, separate from the database row
//! types in [`crate::db`].

pub mod cart;
pub mod checkout;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{CartLine, CartProduct, DropReason, PricedCartItem};
pub use checkout::{
    CheckoutSessionRecord, CheckoutSnapshot, LineItemSnapshot, NewCheckoutSession,
    StatusTransition,
};
pub use product::{Product, ProductDraft, ProductValidationError};
pub use session::CurrentUser;
pub use user::User;
