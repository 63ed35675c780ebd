use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::{get_enum, get_enum_opt, get_timestamp, get_timestamp_opt, get_uuid, get_uuid_opt, now_rfc3339};
use crate::types::{BankAccountType, PixKeyType, Transfer, TransferStatus, TransferType};

const COLUMNS: &str = "id, user_id, transfer_type, status, amount_cents, fee_cents, created_at, completed_at, \
     failure_reason, pix_key, pix_key_type, recipient_name, recipient_document, recipient_bank, \
     recipient_branch, recipient_account, recipient_account_type, recipient_user_id, description";

fn from_row(row: &sqlx::any::AnyRow) -> Result<Transfer, sqlx::Error> {
    Ok(Transfer {
        id: get_uuid(row, "id")?,
        user_id: get_uuid(row, "user_id")?,
        transfer_type: get_enum::<TransferType>(row, "transfer_type")?,
        status: get_enum::<TransferStatus>(row, "status")?,
        amount_cents: row.try_get("amount_cents")?,
        fee_cents: row.try_get("fee_cents")?,
        created_at: get_timestamp(row, "created_at")?,
        completed_at: get_timestamp_opt(row, "completed_at")?,
        failure_reason: row.try_get("failure_reason")?,
        pix_key: row.try_get("pix_key")?,
        pix_key_type: get_enum_opt::<PixKeyType>(row, "pix_key_type")?,
        recipient_name: row.try_get("recipient_name")?,
        recipient_document: row.try_get("recipient_document")?,
        recipient_bank: row.try_get("recipient_bank")?,
        recipient_branch: row.try_get("recipient_branch")?,
        recipient_account: row.try_get("recipient_account")?,
        recipient_account_type: get_enum_opt::<BankAccountType>(row, "recipient_account_type")?,
        recipient_user_id: get_uuid_opt(row, "recipient_user_id")?,
        description: row.try_get("description")?,
    })
}

pub async fn get<'e, E>(exec: E, id: Uuid) -> Result<Option<Transfer>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!("SELECT {COLUMNS} FROM transfers WHERE id = ?");
    let row = sqlx::query(&sql).bind(id.to_string()).fetch_optional(exec).await?;
    row.as_ref().map(from_row).transpose()
}

/// Full insert used for every transfer rail; rail-specific columns the
/// caller doesn't use are left `NULL` by binding `None`.
#[allow(clippy::too_many_arguments)]
pub async fn create<'e, E>(exec: E, t: &Transfer) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!(
        "INSERT INTO transfers ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    );
    sqlx::query(&sql)
        .bind(t.id.to_string())
        .bind(t.user_id.to_string())
        .bind(t.transfer_type.as_str())
        .bind(t.status.as_str())
        .bind(t.amount_cents)
        .bind(t.fee_cents)
        .bind(now_rfc3339(t.created_at))
        .bind(t.completed_at.map(now_rfc3339))
        .bind(t.failure_reason.clone())
        .bind(t.pix_key.clone())
        .bind(t.pix_key_type.map(|k| k.as_str()))
        .bind(t.recipient_name.clone())
        .bind(t.recipient_document.clone())
        .bind(t.recipient_bank.clone())
        .bind(t.recipient_branch.clone())
        .bind(t.recipient_account.clone())
        .bind(t.recipient_account_type.map(|a| a.as_str()))
        .bind(t.recipient_user_id.map(|u| u.to_string()))
        .bind(t.description.clone())
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn mark_completed<'e, E>(exec: E, id: Uuid, completed_at: DateTime<Utc>) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    sqlx::query("UPDATE transfers SET status = ?, completed_at = ? WHERE id = ?")
        .bind(TransferStatus::Completed.as_str())
        .bind(now_rfc3339(completed_at))
        .bind(id.to_string())
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn mark_failed<'e, E>(exec: E, id: Uuid, reason: &str) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    sqlx::query("UPDATE transfers SET status = ?, failure_reason = ? WHERE id = ?")
        .bind(TransferStatus::Failed.as_str())
        .bind(reason)
        .bind(id.to_string())
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn mark_cancelled<'e, E>(exec: E, id: Uuid) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    sqlx::query("UPDATE transfers SET status = ? WHERE id = ?")
        .bind(TransferStatus::Cancelled.as_str())
        .bind(id.to_string())
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn list_for_user<'e, E>(exec: E, user_id: Uuid, limit: i64) -> Result<Vec<Transfer>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!("SELECT {COLUMNS} FROM transfers WHERE user_id = ? ORDER BY created_at DESC LIMIT ?");
    let rows = sqlx::query(&sql).bind(user_id.to_string()).bind(limit).fetch_all(exec).await?;
    rows.iter().map(from_row).collect()
}

/// Sum of completed-transfer spend for a user since `since` — the
/// building block `fincore-limits` uses for daily/monthly windows
/// (spec.md §4.9). Counts `amount_cents + fee_cents`, since a TED's fee
/// is money leaving the sender's account same as the principal. Deposits
/// never count against a spend limit.
pub async fn sum_completed_spend_since<'e, E>(exec: E, user_id: Uuid, since: DateTime<Utc>) -> Result<i64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let row = sqlx::query(
        "SELECT COALESCE(SUM(amount_cents + fee_cents), 0) AS total FROM transfers \
         WHERE user_id = ? AND status = ? AND transfer_type != ? AND completed_at >= ?",
    )
    .bind(user_id.to_string())
    .bind(TransferStatus::Completed.as_str())
    .bind(TransferType::Deposit.as_str())
    .bind(now_rfc3339(since))
    .fetch_one(exec)
    .await?;
    row.try_get("total")
}
