//! User management commands.

use boutique_storefront::services::auth::AuthService;

use super::{CommandError, connect};

/// Create a user with a password, exactly as the signup form would.
pub async fn create(email: &str, password: &str) -> Result<(), CommandError> {
    let pool = connect().await?;

    let user = AuthService::new(&pool)
        .register_with_password(email, password)
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Name: {}",
        user.id,
        user.email,
        user.name
    );
    Ok(())
}
