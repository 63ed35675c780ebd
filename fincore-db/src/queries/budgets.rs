use sqlx::Row;
use uuid::Uuid;

use super::{get_date, get_enum, get_uuid};
use crate::types::{Budget, BudgetPeriod};

const COLUMNS: &str = "id, user_id, category, period, limit_cents, current_spent_cents, alert_threshold_pct, \
     alerts_enabled, start_date, end_date";

fn from_row(row: &sqlx::any::AnyRow) -> Result<Budget, sqlx::Error> {
    Ok(Budget {
        id: get_uuid(row, "id")?,
        user_id: get_uuid(row, "user_id")?,
        category: row.try_get("category")?,
        period: get_enum::<BudgetPeriod>(row, "period")?,
        limit_cents: row.try_get("limit_cents")?,
        current_spent_cents: row.try_get("current_spent_cents")?,
        alert_threshold_pct: row.try_get("alert_threshold_pct")?,
        alerts_enabled: row.try_get("alerts_enabled")?,
        start_date: get_date(row, "start_date")?,
        end_date: get_date(row, "end_date")?,
    })
}

pub async fn get<'e, E>(exec: E, id: Uuid) -> Result<Option<Budget>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!("SELECT {COLUMNS} FROM budgets WHERE id = ?");
    let row = sqlx::query(&sql).bind(id.to_string()).fetch_optional(exec).await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn get_for_update<'e, E>(
    exec: E,
    backend: crate::pool::Backend,
    id: Uuid,
) -> Result<Option<Budget>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!("SELECT {COLUMNS} FROM budgets WHERE id = ?{}", backend.for_update_suffix());
    let row = sqlx::query(&sql).bind(id.to_string()).fetch_optional(exec).await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn list_for_user<'e, E>(exec: E, user_id: Uuid) -> Result<Vec<Budget>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!("SELECT {COLUMNS} FROM budgets WHERE user_id = ? ORDER BY start_date DESC");
    let rows = sqlx::query(&sql).bind(user_id.to_string()).fetch_all(exec).await?;
    rows.iter().map(from_row).collect()
}

pub async fn create<'e, E>(exec: E, b: &Budget) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!("INSERT INTO budgets ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)");
    sqlx::query(&sql)
        .bind(b.id.to_string())
        .bind(b.user_id.to_string())
        .bind(b.category.clone())
        .bind(b.period.as_str())
        .bind(b.limit_cents)
        .bind(b.current_spent_cents)
        .bind(b.alert_threshold_pct)
        .bind(b.alerts_enabled)
        .bind(b.start_date.format("%Y-%m-%d").to_string())
        .bind(b.end_date.format("%Y-%m-%d").to_string())
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn add_spend<'e, E>(exec: E, id: Uuid, amount_cents: i64) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    sqlx::query("UPDATE budgets SET current_spent_cents = current_spent_cents + ? WHERE id = ?")
        .bind(amount_cents)
        .bind(id.to_string())
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn set_alerts_enabled<'e, E>(exec: E, id: Uuid, enabled: bool) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    sqlx::query("UPDATE budgets SET alerts_enabled = ? WHERE id = ?")
        .bind(enabled)
        .bind(id.to_string())
        .execute(exec)
        .await?;
    Ok(())
}
