use sqlx::Row;
use uuid::Uuid;

use super::{get_enum, get_json, get_timestamp, get_uuid, get_uuid_opt, now_rfc3339};
use crate::types::{AuditEntry, AuditStatus};

const COLUMNS: &str = "id, user_id, action, resource_type, resource_id, old_values, new_values, \
     ip_address, user_agent, request_id, status, created_at";

fn from_row(row: &sqlx::any::AnyRow) -> Result<AuditEntry, sqlx::Error> {
    Ok(AuditEntry {
        id: get_uuid(row, "id")?,
        user_id: get_uuid_opt(row, "user_id")?,
        action: row.try_get("action")?,
        resource_type: row.try_get("resource_type")?,
        resource_id: row.try_get("resource_id")?,
        old_values: get_json(row, "old_values")?,
        new_values: get_json(row, "new_values")?,
        ip_address: row.try_get("ip_address")?,
        user_agent: row.try_get("user_agent")?,
        request_id: row.try_get("request_id")?,
        status: get_enum::<AuditStatus>(row, "status")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

/// The only write this module exposes. `fincore-audit` never issues an
/// UPDATE or DELETE against this table (spec.md §3's append-only
/// invariant; Postgres also refuses both at the schema level).
pub async fn insert<'e, E>(exec: E, entry: &AuditEntry) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!("INSERT INTO audit_entries ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)");
    sqlx::query(&sql)
        .bind(entry.id.to_string())
        .bind(entry.user_id.map(|u| u.to_string()))
        .bind(entry.action.clone())
        .bind(entry.resource_type.clone())
        .bind(entry.resource_id.clone())
        .bind(entry.old_values.to_string())
        .bind(entry.new_values.to_string())
        .bind(entry.ip_address.clone())
        .bind(entry.user_agent.clone())
        .bind(entry.request_id.clone())
        .bind(entry.status.as_str())
        .bind(now_rfc3339(entry.created_at))
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn list_for_user<'e, E>(exec: E, user_id: Uuid, limit: i64) -> Result<Vec<AuditEntry>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!("SELECT {COLUMNS} FROM audit_entries WHERE user_id = ? ORDER BY created_at DESC LIMIT ?");
    let rows = sqlx::query(&sql).bind(user_id.to_string()).bind(limit).fetch_all(exec).await?;
    rows.iter().map(from_row).collect()
}
