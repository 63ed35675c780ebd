use sqlx::Row;
use uuid::Uuid;

use super::{get_date, get_enum, get_timestamp_opt, get_uuid, now_rfc3339};
use crate::types::{Bill, BillStatus};

const COLUMNS: &str = "id, user_id, barcode, amount_cents, fee_cents, final_amount_cents, status, \
     recipient_name, due_date, paid_at";

fn from_row(row: &sqlx::any::AnyRow) -> Result<Bill, sqlx::Error> {
    Ok(Bill {
        id: get_uuid(row, "id")?,
        user_id: get_uuid(row, "user_id")?,
        barcode: row.try_get("barcode")?,
        amount_cents: row.try_get("amount_cents")?,
        fee_cents: row.try_get("fee_cents")?,
        final_amount_cents: row.try_get("final_amount_cents")?,
        status: get_enum::<BillStatus>(row, "status")?,
        recipient_name: row.try_get("recipient_name")?,
        due_date: get_date(row, "due_date")?,
        paid_at: get_timestamp_opt(row, "paid_at")?,
    })
}

pub async fn get<'e, E>(exec: E, id: Uuid) -> Result<Option<Bill>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!("SELECT {COLUMNS} FROM bills WHERE id = ?");
    let row = sqlx::query(&sql).bind(id.to_string()).fetch_optional(exec).await?;
    row.as_ref().map(from_row).transpose()
}

/// Looked up before every payment attempt: a barcode that already has
/// a `paid` row is rejected with `BillAlreadyPaid` (spec.md §4.7).
pub async fn get_by_barcode<'e, E>(exec: E, barcode: &str) -> Result<Option<Bill>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!("SELECT {COLUMNS} FROM bills WHERE barcode = ?");
    let row = sqlx::query(&sql).bind(barcode).fetch_optional(exec).await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn create<'e, E>(exec: E, b: &Bill) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!("INSERT INTO bills ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)");
    sqlx::query(&sql)
        .bind(b.id.to_string())
        .bind(b.user_id.to_string())
        .bind(b.barcode.clone())
        .bind(b.amount_cents)
        .bind(b.fee_cents)
        .bind(b.final_amount_cents)
        .bind(b.status.as_str())
        .bind(b.recipient_name.clone())
        .bind(b.due_date.format("%Y-%m-%d").to_string())
        .bind(b.paid_at.map(now_rfc3339))
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn mark_paid<'e, E>(exec: E, id: Uuid, paid_at: chrono::DateTime<chrono::Utc>) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    sqlx::query("UPDATE bills SET status = ?, paid_at = ? WHERE id = ?")
        .bind(BillStatus::Paid.as_str())
        .bind(now_rfc3339(paid_at))
        .bind(id.to_string())
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn mark_failed<'e, E>(exec: E, id: Uuid) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    sqlx::query("UPDATE bills SET status = ? WHERE id = ?")
        .bind(BillStatus::Failed.as_str())
        .bind(id.to_string())
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn list_for_user<'e, E>(exec: E, user_id: Uuid) -> Result<Vec<Bill>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!("SELECT {COLUMNS} FROM bills WHERE user_id = ? ORDER BY due_date DESC");
    let rows = sqlx::query(&sql).bind(user_id.to_string()).fetch_all(exec).await?;
    rows.iter().map(from_row).collect()
}
