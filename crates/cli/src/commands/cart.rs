//! Cart inspection.

use rust_decimal::Decimal;
use tracing::{info, warn};

use boutique_core::Email;
use boutique_storefront::db::{CartRepository, CheckoutSessionRepository, UserRepository};
use boutique_storefront::models::cart::{cart_total, item_count};

use super::{CommandError, connect, currency};

const RECENT_SESSIONS: i64 = 5;

/// Print the cart of the user with `email`, resolving each line against the catalog.
///
/// Lines whose product was deleted or can no longer be priced are listed
/// with the reason the dashboard would drop them. The user's last checkout
/// sessions follow, with the amounts frozen when each was opened.
pub async fn show(email: &str) -> Result<(), CommandError> {
    let currency = currency()?;
    let pool = connect().await?;

    let user = match Email::parse(email) {
        Ok(email) => UserRepository::new(&pool).get_by_email(&email).await?,
        Err(_) => None,
    }
    .ok_or_else(|| CommandError::UnknownUser(email.to_owned()))?;

    let lines = CartRepository::new(&pool).lines(user.id).await?;
    info!("Cart of {} (user #{}): {} line(s)", user.email, user.id, lines.len());

    let mut priced = Vec::with_capacity(lines.len());
    for line in &lines {
        match line.price(currency) {
            Ok(item) => {
                info!(
                    "  #{} {} x{} = {}",
                    item.product_id,
                    item.title,
                    item.quantity,
                    item.line_price()
                );
                priced.push(item);
            }
            Err(reason) => warn!(
                "  #{} x{} unavailable ({})",
                line.product_id,
                line.quantity,
                reason.as_str()
            ),
        }
    }

    info!(
        "Total: {} for {} item(s)",
        cart_total(&priced, currency),
        item_count(&priced)
    );

    let sessions = CheckoutSessionRepository::new(&pool)
        .recent_for_user(user.id, RECENT_SESSIONS)
        .await?;
    for session in &sessions {
        info!(
            "  {} {} {} {} for {} item(s), opened {}",
            session.id,
            session.status,
            Decimal::new(session.amount_total, 2),
            session.snapshot.currency,
            session.snapshot.total_quantity(),
            session.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
