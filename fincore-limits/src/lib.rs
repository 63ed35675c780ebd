//! `remaining(user, window) := user.window_limit − spend(user, window)`
//! (spec.md §4.9), shared by the transfer engine, bill payer and card
//! vault. Callers are responsible for reading under the appropriate
//! row lock first — this crate only does arithmetic and one query.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use uuid::Uuid;

use fincore_db::queries::{card_transactions, transfers};
use fincore_db::types::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Daily,
    Monthly,
}

/// Start of the window containing `now`: midnight today (UTC) for
/// `Daily`, the first of the month (UTC) for `Monthly`.
pub fn window_start(window: Window, now: DateTime<Utc>) -> DateTime<Utc> {
    match window {
        Window::Daily => Utc
            .with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
            .single()
            .expect("a calendar day always has a valid midnight"),
        Window::Monthly => Utc
            .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .single()
            .expect("the first of a month is always a valid instant"),
    }
}

fn limit_for(user: &User, window: Window) -> i64 {
    match window {
        Window::Daily => user.daily_transfer_limit_cents,
        Window::Monthly => user.monthly_transfer_limit_cents,
    }
}

/// Remaining spend headroom for a user's transfer limit in the given
/// window. `exec` must be bound to the transaction holding the user's
/// row lock — reading the materialised spend pre-lock would be a TOCTOU
/// (spec.md §4.6).
pub async fn user_remaining<'e, E>(exec: E, user: &User, window: Window, now: DateTime<Utc>) -> Result<i64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let spent = transfers::sum_completed_spend_since(exec, user.id, window_start(window, now)).await?;
    Ok(limit_for(user, window) - spent)
}

/// Per-card variant: `spend(card, window)` is a `SUM` over
/// `card_transactions` scoped to the window, the same derived-rather-
/// than-materialised shape as [`user_remaining`] — a card's spend can't
/// drift from the ledger it's summing, and the window rolls forward on
/// its own instead of needing an explicit reset job.
pub async fn card_remaining<'e, E>(
    exec: E,
    window: Window,
    limit_cents: i64,
    card_id: Uuid,
    now: DateTime<Utc>,
) -> Result<i64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let spent = card_transactions::sum_completed_spend_since(exec, card_id, window_start(window, now)).await?;
    Ok(limit_cents - spent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_window_starts_at_midnight_utc() {
        let now = Utc.with_ymd_and_hms(2026, 3, 5, 14, 30, 0).unwrap();
        let start = window_start(Window::Daily, now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn monthly_window_starts_on_the_first() {
        let now = Utc.with_ymd_and_hms(2026, 3, 5, 14, 30, 0).unwrap();
        let start = window_start(Window::Monthly, now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn card_remaining_subtracts_window_spend() {
        let gateway = fincore_db::Gateway::connect("sqlite::memory:", 1).await.unwrap();
        gateway.apply_schema().await.unwrap();
        let user_id = Uuid::new_v4();
        let card_id = Uuid::new_v4();
        let now = Utc.with_ymd_and_hms(2026, 3, 5, 12, 0, 0).unwrap();

        let mut tx = gateway.begin().await.unwrap();
        fincore_db::queries::users::create(&mut *tx, user_id, 0, 0).await.unwrap();
        fincore_db::queries::cards::create(
            &mut *tx,
            &fincore_db::types::Card {
                id: card_id,
                user_id,
                card_type: fincore_db::types::CardType::Virtual,
                brand: fincore_db::types::CardBrand::Visa,
                status: fincore_db::types::CardStatus::Active,
                card_number_ct: vec![],
                cvv_ct: vec![],
                pin_hash: None,
                last_four: "1234".to_string(),
                holder_name: "Alice Doe".to_string(),
                expiry_month: 1,
                expiry_year: 2030,
                daily_limit_cents: 10_000,
                monthly_limit_cents: 100_000,
                is_contactless: true,
                is_international: false,
                block_international: false,
                block_online: false,
                created_at: now,
                expires_at: now + chrono::Duration::days(365),
                blocked_at: None,
            },
        )
        .await
        .unwrap();
        card_transactions::create(
            &mut *tx,
            &fincore_db::types::CardTransaction {
                id: Uuid::new_v4(),
                card_id,
                user_id,
                amount_cents: 3_000,
                merchant_name: "Shop".to_string(),
                merchant_category: "retail".to_string(),
                status: "approved".to_string(),
                transaction_date: now,
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let daily = card_remaining(gateway.pool(), Window::Daily, 10_000, card_id, now).await.unwrap();
        let monthly = card_remaining(gateway.pool(), Window::Monthly, 100_000, card_id, now).await.unwrap();
        assert_eq!(daily, 7_000);
        assert_eq!(monthly, 97_000);
    }
}
