use sqlx::Row;
use uuid::Uuid;

use super::{get_enum, get_uuid};
use crate::pool::Backend;
use crate::types::{User, UserStatus};

fn from_row(row: &sqlx::any::AnyRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: get_uuid(row, "id")?,
        balance_cents: row.try_get("balance_cents")?,
        daily_transfer_limit_cents: row.try_get("daily_transfer_limit_cents")?,
        monthly_transfer_limit_cents: row.try_get("monthly_transfer_limit_cents")?,
        status: get_enum(row, "status")?,
    })
}

pub async fn get<'e, E>(exec: E, id: Uuid) -> Result<Option<User>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let row = sqlx::query(
        "SELECT id, balance_cents, daily_transfer_limit_cents, monthly_transfer_limit_cents, status \
         FROM users WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(exec)
    .await?;
    row.as_ref().map(from_row).transpose()
}

/// Locks the row for the lifetime of the caller's transaction
/// (spec.md §4.2). Must only be called against a `Transaction`, never
/// the bare pool, or the lock released the instant the query returns.
pub async fn get_for_update<'e, E>(exec: E, backend: Backend, id: Uuid) -> Result<Option<User>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!(
        "SELECT id, balance_cents, daily_transfer_limit_cents, monthly_transfer_limit_cents, status \
         FROM users WHERE id = ?{}",
        backend.for_update_suffix()
    );
    let row = sqlx::query(&sql).bind(id.to_string()).fetch_optional(exec).await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn create<'e, E>(
    exec: E,
    id: Uuid,
    daily_transfer_limit_cents: i64,
    monthly_transfer_limit_cents: i64,
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    sqlx::query(
        "INSERT INTO users (id, balance_cents, daily_transfer_limit_cents, monthly_transfer_limit_cents, status) \
         VALUES (?, 0, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(daily_transfer_limit_cents)
    .bind(monthly_transfer_limit_cents)
    .bind(UserStatus::Active.as_str())
    .execute(exec)
    .await?;
    Ok(())
}

/// Applies a signed delta to the balance rather than overwriting it
/// (spec.md §9's additive-update invariant), so two concurrent holders
/// of the row lock can never clobber each other's write.
pub async fn adjust_balance<'e, E>(exec: E, id: Uuid, delta_cents: i64) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    sqlx::query("UPDATE users SET balance_cents = balance_cents + ? WHERE id = ?")
        .bind(delta_cents)
        .bind(id.to_string())
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn set_status<'e, E>(exec: E, id: Uuid, status: UserStatus) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    sqlx::query("UPDATE users SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(id.to_string())
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn set_limits<'e, E>(exec: E, id: Uuid, daily_cents: i64, monthly_cents: i64) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    sqlx::query("UPDATE users SET daily_transfer_limit_cents = ?, monthly_transfer_limit_cents = ? WHERE id = ?")
        .bind(daily_cents)
        .bind(monthly_cents)
        .bind(id.to_string())
        .execute(exec)
        .await?;
    Ok(())
}
