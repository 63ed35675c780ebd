use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::{get_timestamp, get_uuid, now_rfc3339};
use crate::types::CardTransaction;

const COLUMNS: &str = "id, card_id, user_id, amount_cents, merchant_name, merchant_category, status, transaction_date";

fn from_row(row: &sqlx::any::AnyRow) -> Result<CardTransaction, sqlx::Error> {
    Ok(CardTransaction {
        id: get_uuid(row, "id")?,
        card_id: get_uuid(row, "card_id")?,
        user_id: get_uuid(row, "user_id")?,
        amount_cents: row.try_get("amount_cents")?,
        merchant_name: row.try_get("merchant_name")?,
        merchant_category: row.try_get("merchant_category")?,
        status: row.try_get("status")?,
        transaction_date: get_timestamp(row, "transaction_date")?,
    })
}

/// Records a card transaction and bumps the card's spend counters in
/// the same caller-managed transaction (spec.md §9: transaction row
/// and counter update happen together or not at all).
pub async fn create<'e, E>(exec: E, t: &CardTransaction) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!("INSERT INTO card_transactions ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)");
    sqlx::query(&sql)
        .bind(t.id.to_string())
        .bind(t.card_id.to_string())
        .bind(t.user_id.to_string())
        .bind(t.amount_cents)
        .bind(t.merchant_name.clone())
        .bind(t.merchant_category.clone())
        .bind(t.status.clone())
        .bind(now_rfc3339(t.transaction_date))
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn list_for_card<'e, E>(exec: E, card_id: Uuid, limit: i64) -> Result<Vec<CardTransaction>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!("SELECT {COLUMNS} FROM card_transactions WHERE card_id = ? ORDER BY transaction_date DESC LIMIT ?");
    let rows = sqlx::query(&sql).bind(card_id.to_string()).bind(limit).fetch_all(exec).await?;
    rows.iter().map(from_row).collect()
}

/// Sum of approved spend on a card since `since` — the rolling-window
/// equivalent of `transfers::sum_completed_spend_since`, used instead
/// of a materialised counter so a card's daily/monthly spend can never
/// outlive the window it's supposed to describe.
pub async fn sum_completed_spend_since<'e, E>(exec: E, card_id: Uuid, since: DateTime<Utc>) -> Result<i64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let row = sqlx::query(
        "SELECT COALESCE(SUM(amount_cents), 0) AS total FROM card_transactions \
         WHERE card_id = ? AND status = 'approved' AND transaction_date >= ?",
    )
    .bind(card_id.to_string())
    .bind(now_rfc3339(since))
    .fetch_one(exec)
    .await?;
    row.try_get("total")
}
