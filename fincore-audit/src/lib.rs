//! Audit journal (spec.md §4.3). Exposes one operation: [`record`].
//!
//! The coordinator calls `record` as part of the same transaction as a
//! successful business mutation, and again in a fresh transaction on
//! the failure branch with `status = Failure` and `new_values` omitted.
//! Immutability is enforced at the store: the schema rejects UPDATE and
//! DELETE on `audit_entries`, so this crate never issues either.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use fincore_db::queries::audit;
use fincore_db::types::{AuditEntry, AuditStatus};

pub struct RecordInput {
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub old_values: serde_json::Value,
    pub new_values: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: String,
    pub status: AuditStatus,
}

pub async fn record<'e, E>(exec: E, input: RecordInput, now: DateTime<Utc>) -> Result<Uuid, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let entry = AuditEntry {
        id: Uuid::new_v4(),
        user_id: input.user_id,
        action: input.action,
        resource_type: input.resource_type,
        resource_id: input.resource_id,
        old_values: input.old_values,
        new_values: input.new_values,
        ip_address: input.ip_address,
        user_agent: input.user_agent,
        request_id: input.request_id,
        status: input.status,
        created_at: now,
    };
    audit::insert(exec, &entry).await?;
    Ok(entry.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fincore_db::Gateway;
    use serde_json::json;

    #[tokio::test]
    async fn record_persists_a_retrievable_entry() {
        let gateway = Gateway::connect("sqlite::memory:", 1).await.unwrap();
        gateway.apply_schema().await.unwrap();

        let user_id = Uuid::new_v4();
        let input = RecordInput {
            user_id: Some(user_id),
            action: "transfer.pix".to_string(),
            resource_type: "TRANSFER".to_string(),
            resource_id: Uuid::new_v4().to_string(),
            old_values: json!({}),
            new_values: json!({"amount_cents": 15_000}),
            ip_address: None,
            user_agent: None,
            request_id: Uuid::new_v4().to_string(),
            status: AuditStatus::Success,
        };
        record(gateway.pool(), input, Utc::now()).await.unwrap();

        let entries = audit::list_for_user(gateway.pool(), user_id, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "transfer.pix");
    }

    /// The Postgres migration installs `DO INSTEAD NOTHING` rules on
    /// `audit_entries` (migrations/postgres/0001_init.sql) — sqlite has
    /// no rule mechanism to exercise, so this needs a real Postgres and
    /// is `#[ignore]`d by default. Run against a scratch database with
    /// `DATABASE_URL=postgres://... cargo test -- --ignored`.
    #[tokio::test]
    #[ignore = "requires a live Postgres DATABASE_URL; sqlite has no rule mechanism to exercise"]
    async fn raw_update_and_delete_against_audit_entries_are_silently_rejected() {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a scratch postgres database");
        let gateway = Gateway::connect(&database_url, 1).await.unwrap();
        gateway.apply_schema().await.unwrap();

        let user_id = Uuid::new_v4();
        let input = RecordInput {
            user_id: Some(user_id),
            action: "transfer.pix".to_string(),
            resource_type: "TRANSFER".to_string(),
            resource_id: Uuid::new_v4().to_string(),
            old_values: json!({}),
            new_values: json!({"amount_cents": 15_000}),
            ip_address: None,
            user_agent: None,
            request_id: Uuid::new_v4().to_string(),
            status: AuditStatus::Success,
        };
        let id = record(gateway.pool(), input, Utc::now()).await.unwrap();

        sqlx::query("UPDATE audit_entries SET action = 'tampered' WHERE id = ?")
            .bind(id.to_string())
            .execute(gateway.pool())
            .await
            .unwrap();
        sqlx::query("DELETE FROM audit_entries WHERE id = ?")
            .bind(id.to_string())
            .execute(gateway.pool())
            .await
            .unwrap();

        let entries = audit::list_for_user(gateway.pool(), user_id, 10).await.unwrap();
        assert_eq!(entries.len(), 1, "the DELETE must have been a no-op");
        assert_eq!(entries[0].action, "transfer.pix", "the UPDATE must have been a no-op");
    }
}
