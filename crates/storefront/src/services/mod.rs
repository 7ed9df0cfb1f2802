//! Business logic services for the storefront.
//!
//! - `auth` - Password accounts and reset tokens
//! - `checkout` - Cart reconciliation, Stripe sessions, webhook outcomes
//! - `email` - Transactional email over SMTP

pub mod auth;
pub mod checkout;
pub mod email;
