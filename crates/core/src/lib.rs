//! Boutique Core - Shared domain types.
//!
//! This crate provides the types shared by every boutique component:
//! - `storefront` - The web shop (catalog, cart, Stripe checkout)
//! - `cli` - Command-line tools for migrations, seeding and support
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. Database support is behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, quantities, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
