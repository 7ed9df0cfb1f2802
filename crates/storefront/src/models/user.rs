//! User domain types.

use chrono::{DateTime, Utc};

use boutique_core::{Email, UserId};

/// A registered shop user.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name, defaulted from the email's local part at signup.
    pub name: String,
    /// User's email address.
    pub email: Email,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}
