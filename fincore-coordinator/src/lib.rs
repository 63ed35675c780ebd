//! Operation coordinator (spec.md §4.10). Thin by design: for every
//! public operation it opens one transaction, calls the relevant
//! component, records one audit entry, and commits or rolls back. It
//! never re-implements a component's business rules.
//!
//! Mapping a propagated [`fincore_error::Error`] to an HTTP status and
//! JSON envelope is `fincore-api`'s job, not this crate's — see the
//! note on [`fincore_error::Error`] itself. This crate only produces the
//! already-typed error; it never inspects or re-codes it.

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use fincore_audit::RecordInput;
use fincore_config::Argon2Params;
use fincore_db::types::AuditStatus;
use fincore_db::{Backend, Gateway};

use fincore_bills::BillError;
use fincore_budgets::BudgetError;
use fincore_cardvault::{CardVaultError, CreateCardInput, SecuritySettings};
use fincore_transfers::{PixInput, TedInput};

/// Everything the coordinator needs about the calling request that
/// isn't specific to one operation: the caller's identity (already
/// extracted from the trusted header by `fincore-api`), a correlation
/// id for the audit trail, and the request clock.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub request_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub now: DateTime<Utc>,
}

/// What an operation's success value contributes to its audit row.
/// Reads (`get`/`list`/`verify_pin`) don't go through [`Coordinator::finish`]
/// at all and so never implement this — only state-mutating operations do.
trait AuditSubject {
    fn resource_id(&self) -> String;
    fn audit_values(&self) -> serde_json::Value;
}

impl AuditSubject for () {
    fn resource_id(&self) -> String {
        String::new()
    }
    fn audit_values(&self) -> serde_json::Value {
        json!({})
    }
}

impl AuditSubject for fincore_db::types::Transfer {
    fn resource_id(&self) -> String {
        self.id.to_string()
    }
    fn audit_values(&self) -> serde_json::Value {
        json!({
            "transfer_type": self.transfer_type.as_str(),
            "status": self.status.as_str(),
            "amount_cents": self.amount_cents,
            "fee_cents": self.fee_cents,
        })
    }
}

impl AuditSubject for fincore_cardvault::CardDetails {
    fn resource_id(&self) -> String {
        self.id.to_string()
    }
    fn audit_values(&self) -> serde_json::Value {
        json!({
            "status": self.status,
            "daily_limit_cents": self.daily_limit_cents,
            "monthly_limit_cents": self.monthly_limit_cents,
        })
    }
}

impl AuditSubject for fincore_db::types::CardTransaction {
    fn resource_id(&self) -> String {
        self.id.to_string()
    }
    fn audit_values(&self) -> serde_json::Value {
        json!({"amount_cents": self.amount_cents, "status": self.status})
    }
}

impl AuditSubject for fincore_db::types::Bill {
    fn resource_id(&self) -> String {
        self.id.to_string()
    }
    fn audit_values(&self) -> serde_json::Value {
        json!({"status": self.status.as_str(), "amount_cents": self.amount_cents})
    }
}

impl AuditSubject for fincore_db::types::Budget {
    fn resource_id(&self) -> String {
        self.id.to_string()
    }
    fn audit_values(&self) -> serde_json::Value {
        json!({"category": self.category, "current_spent_cents": self.current_spent_cents})
    }
}

pub struct Coordinator {
    gateway: Gateway,
}

impl Coordinator {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub fn backend(&self) -> Backend {
        self.gateway.backend()
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Commits and records a success audit row in the same transaction,
    /// or rolls back and records a failure row in a fresh one
    /// (spec.md §4.10, §5 "Audit-log appends inherit the transaction's
    /// commit order").
    async fn finish<T, E>(
        &self,
        mut tx: sqlx::Transaction<'_, sqlx::Any>,
        ctx: &RequestContext,
        action: &str,
        resource_type: &str,
        result: Result<T, E>,
    ) -> Result<T, fincore_error::Error>
    where
        T: AuditSubject,
        E: Into<fincore_error::Error>,
    {
        match result {
            Ok(value) => {
                let input = RecordInput {
                    user_id: Some(ctx.user_id),
                    action: action.to_string(),
                    resource_type: resource_type.to_string(),
                    resource_id: value.resource_id(),
                    old_values: json!({}),
                    new_values: value.audit_values(),
                    ip_address: ctx.ip_address.clone(),
                    user_agent: ctx.user_agent.clone(),
                    request_id: ctx.request_id.clone(),
                    status: AuditStatus::Success,
                };
                fincore_audit::record(&mut *tx, input, ctx.now).await.map_err(fincore_db::map_db_error)?;
                tx.commit().await.map_err(fincore_db::map_db_error)?;
                Ok(value)
            }
            Err(e) => {
                let _ = tx.rollback().await;
                let mapped: fincore_error::Error = e.into();
                if let Ok(mut audit_tx) = self.gateway.begin().await {
                    let input = RecordInput {
                        user_id: Some(ctx.user_id),
                        action: action.to_string(),
                        resource_type: resource_type.to_string(),
                        resource_id: String::new(),
                        old_values: json!({}),
                        new_values: serde_json::Value::Null,
                        ip_address: ctx.ip_address.clone(),
                        user_agent: ctx.user_agent.clone(),
                        request_id: ctx.request_id.clone(),
                        status: AuditStatus::Failure,
                    };
                    let _ = fincore_audit::record(&mut *audit_tx, input, ctx.now).await;
                    let _ = audit_tx.commit().await;
                }
                Err(mapped)
            }
        }
    }

    async fn begin(&self) -> Result<sqlx::Transaction<'_, sqlx::Any>, fincore_error::Error> {
        self.gateway.begin().await.map_err(fincore_db::map_db_error)
    }

    /// Runs the budget accountant against a just-completed outflow, in
    /// the same transaction as the outflow itself (spec.md §4.8).
    /// Budgets are advisory and never block a transfer, so a failure
    /// here is swallowed rather than surfaced — the caller's own result
    /// is what decides whether the transaction commits.
    async fn apply_budget_outflow(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Any>,
        user_id: Uuid,
        category: &str,
        amount_cents: i64,
        completed_at: DateTime<Utc>,
    ) {
        let _ = fincore_budgets::apply_outflow(tx, self.backend(), user_id, category, amount_cents, completed_at).await;
    }

    // -- transfers --------------------------------------------------

    pub async fn pix(&self, ctx: &RequestContext, input: PixInput) -> Result<fincore_db::types::Transfer, fincore_error::Error> {
        let mut tx = self.begin().await?;
        let result = fincore_transfers::pix(&mut tx, self.backend(), ctx.user_id, input, ctx.now).await;
        if let Ok(transfer) = &result {
            self.apply_budget_outflow(&mut tx, ctx.user_id, "pix", transfer.amount_cents + transfer.fee_cents, ctx.now).await;
        }
        self.finish(tx, ctx, "transfer.pix", "TRANSFER", result).await
    }

    pub async fn ted(&self, ctx: &RequestContext, input: TedInput) -> Result<fincore_db::types::Transfer, fincore_error::Error> {
        let mut tx = self.begin().await?;
        let result = fincore_transfers::ted(&mut tx, self.backend(), ctx.user_id, input, ctx.now).await;
        if let Ok(transfer) = &result {
            self.apply_budget_outflow(&mut tx, ctx.user_id, "ted", transfer.amount_cents + transfer.fee_cents, ctx.now).await;
        }
        self.finish(tx, ctx, "transfer.ted", "TRANSFER", result).await
    }

    pub async fn p2p_immediate(
        &self,
        ctx: &RequestContext,
        recipient_id: Uuid,
        amount_cents: i64,
        description: Option<String>,
    ) -> Result<fincore_db::types::Transfer, fincore_error::Error> {
        let mut tx = self.begin().await?;
        let result = fincore_transfers::p2p_immediate(
            &mut tx,
            self.backend(),
            ctx.user_id,
            recipient_id,
            amount_cents,
            description,
            ctx.now,
        )
        .await;
        if let Ok(transfer) = &result {
            self.apply_budget_outflow(&mut tx, ctx.user_id, "p2p", transfer.amount_cents + transfer.fee_cents, ctx.now).await;
        }
        self.finish(tx, ctx, "transfer.p2p", "TRANSFER", result).await
    }

    pub async fn deposit(&self, ctx: &RequestContext, amount_cents: i64) -> Result<fincore_db::types::Transfer, fincore_error::Error> {
        let mut tx = self.begin().await?;
        let result = fincore_transfers::deposit(&mut tx, ctx.user_id, amount_cents, ctx.now).await;
        self.finish(tx, ctx, "transfer.deposit", "TRANSFER", result).await
    }

    pub async fn p2p_request(
        &self,
        ctx: &RequestContext,
        payer_id: Uuid,
        amount_cents: i64,
        description: Option<String>,
    ) -> Result<fincore_db::types::Transfer, fincore_error::Error> {
        let mut tx = self.begin().await?;
        let result = fincore_transfers::p2p_request(&mut tx, payer_id, ctx.user_id, amount_cents, description, ctx.now).await;
        self.finish(tx, ctx, "transfer.p2p_request", "TRANSFER", result).await
    }

    pub async fn p2p_approve(&self, ctx: &RequestContext, transfer_id: Uuid) -> Result<fincore_db::types::Transfer, fincore_error::Error> {
        let mut tx = self.begin().await?;
        let result = fincore_transfers::p2p_approve(&mut tx, self.backend(), ctx.user_id, transfer_id, ctx.now).await;
        if let Ok(transfer) = &result {
            self.apply_budget_outflow(&mut tx, ctx.user_id, "p2p", transfer.amount_cents + transfer.fee_cents, ctx.now).await;
        }
        self.finish(tx, ctx, "transfer.p2p_approve", "TRANSFER", result).await
    }

    pub async fn p2p_reject(&self, ctx: &RequestContext, transfer_id: Uuid) -> Result<fincore_db::types::Transfer, fincore_error::Error> {
        let mut tx = self.begin().await?;
        let result = fincore_transfers::p2p_reject(&mut tx, ctx.user_id, transfer_id).await;
        self.finish(tx, ctx, "transfer.p2p_reject", "TRANSFER", result).await
    }

    pub async fn cancel_transfer(&self, ctx: &RequestContext, transfer_id: Uuid) -> Result<fincore_db::types::Transfer, fincore_error::Error> {
        let mut tx = self.begin().await?;
        let result = fincore_transfers::cancel(&mut tx, ctx.user_id, transfer_id).await;
        self.finish(tx, ctx, "transfer.cancel", "TRANSFER", result).await
    }

    /// Reads never open an audit-bearing transaction; they take the
    /// pool directly and surface the typed error as-is.
    pub async fn list_transfers(&self, ctx: &RequestContext, limit: i64) -> Result<Vec<fincore_db::types::Transfer>, fincore_error::Error> {
        fincore_db::queries::transfers::list_for_user(self.gateway.pool(), ctx.user_id, limit)
            .await
            .map_err(fincore_db::map_db_error)
    }

    // -- cards --------------------------------------------------------

    pub async fn create_card(
        &self,
        ctx: &RequestContext,
        aes_key: &[u8; 32],
        argon2_params: Argon2Params,
        input: CreateCardInput,
    ) -> Result<fincore_cardvault::CardDetails, fincore_error::Error> {
        let mut tx = self.begin().await?;
        let result = fincore_cardvault::create(&mut tx, aes_key, argon2_params, ctx.user_id, input, ctx.now).await;
        self.finish(tx, ctx, "card.create", "CARD", result).await
    }

    pub async fn get_card(&self, ctx: &RequestContext, card_id: Uuid) -> Result<fincore_cardvault::CardDetails, CardVaultError> {
        let mut tx = self.gateway.begin().await.map_err(CardVaultError::Db)?;
        fincore_cardvault::get_details(&mut tx, ctx.user_id, card_id, ctx.now).await
    }

    pub async fn list_cards(&self, ctx: &RequestContext) -> Result<Vec<fincore_cardvault::CardDetails>, CardVaultError> {
        let mut tx = self.gateway.begin().await.map_err(CardVaultError::Db)?;
        fincore_cardvault::list(&mut tx, ctx.user_id, ctx.now).await
    }

    pub async fn block_card(&self, ctx: &RequestContext, card_id: Uuid) -> Result<fincore_cardvault::CardDetails, fincore_error::Error> {
        let mut tx = self.begin().await?;
        let result = fincore_cardvault::block(&mut tx, self.backend(), ctx.user_id, card_id, ctx.now).await;
        self.finish(tx, ctx, "card.block", "CARD", result).await
    }

    pub async fn unblock_card(&self, ctx: &RequestContext, card_id: Uuid) -> Result<fincore_cardvault::CardDetails, fincore_error::Error> {
        let mut tx = self.begin().await?;
        let result = fincore_cardvault::unblock(&mut tx, self.backend(), ctx.user_id, card_id, ctx.now).await;
        self.finish(tx, ctx, "card.unblock", "CARD", result).await
    }

    pub async fn update_card_limits(
        &self,
        ctx: &RequestContext,
        card_id: Uuid,
        daily_limit_cents: i64,
        monthly_limit_cents: i64,
    ) -> Result<fincore_cardvault::CardDetails, fincore_error::Error> {
        let mut tx = self.begin().await?;
        let result = fincore_cardvault::update_limits(
            &mut tx,
            self.backend(),
            ctx.user_id,
            card_id,
            daily_limit_cents,
            monthly_limit_cents,
            ctx.now,
        )
        .await;
        self.finish(tx, ctx, "card.update_limits", "CARD", result).await
    }

    pub async fn update_card_security(
        &self,
        ctx: &RequestContext,
        card_id: Uuid,
        settings: SecuritySettings,
    ) -> Result<fincore_cardvault::CardDetails, fincore_error::Error> {
        let mut tx = self.begin().await?;
        let result = fincore_cardvault::update_security_settings(&mut tx, self.backend(), ctx.user_id, card_id, settings, ctx.now).await;
        self.finish(tx, ctx, "card.update_security", "CARD", result).await
    }

    pub async fn set_card_pin(
        &self,
        ctx: &RequestContext,
        argon2_params: Argon2Params,
        card_id: Uuid,
        new_pin: &str,
        current_pin: Option<&str>,
    ) -> Result<(), fincore_error::Error> {
        let mut tx = self.begin().await?;
        let result = fincore_cardvault::set_pin(&mut tx, self.backend(), argon2_params, ctx.user_id, card_id, new_pin, current_pin).await;
        self.finish(tx, ctx, "card.set_pin", "CARD", result).await
    }

    pub async fn cancel_card(&self, ctx: &RequestContext, card_id: Uuid) -> Result<fincore_cardvault::CardDetails, fincore_error::Error> {
        let mut tx = self.begin().await?;
        let result = fincore_cardvault::cancel(&mut tx, self.backend(), ctx.user_id, card_id, ctx.now).await;
        self.finish(tx, ctx, "card.cancel", "CARD", result).await
    }

    pub async fn process_card_transaction(
        &self,
        ctx: &RequestContext,
        card_id: Uuid,
        amount_cents: i64,
        merchant_name: String,
        merchant_category: String,
    ) -> Result<fincore_db::types::CardTransaction, fincore_error::Error> {
        let mut tx = self.begin().await?;
        let result =
            fincore_cardvault::process_transaction(&mut tx, self.backend(), card_id, amount_cents, merchant_name, merchant_category, ctx.now)
                .await;
        if let Ok(transaction) = &result {
            self.apply_budget_outflow(
                &mut tx,
                transaction.user_id,
                &transaction.merchant_category,
                transaction.amount_cents,
                transaction.transaction_date,
            )
            .await;
        }
        self.finish(tx, ctx, "card.process_transaction", "CARD_TRANSACTION", result).await
    }

    // -- bills ----------------------------------------------------------

    pub async fn pay_bill(
        &self,
        ctx: &RequestContext,
        barcode: &str,
        recipient_name: String,
        due_date: chrono::NaiveDate,
    ) -> Result<fincore_db::types::Bill, fincore_error::Error> {
        let mut tx = self.begin().await?;
        let result = fincore_bills::pay(&mut tx, self.backend(), ctx.user_id, barcode, recipient_name, due_date, ctx.now).await;
        if let Ok(bill) = &result {
            self.apply_budget_outflow(&mut tx, ctx.user_id, "bills", bill.final_amount_cents, ctx.now).await;
        }
        self.finish(tx, ctx, "bill.pay", "BILL", result).await
    }

    pub async fn list_bills(&self, ctx: &RequestContext) -> Result<Vec<fincore_db::types::Bill>, BillError> {
        let mut tx = self.gateway.begin().await.map_err(BillError::Db)?;
        fincore_bills::list(&mut tx, ctx.user_id).await
    }

    // -- budgets --------------------------------------------------------

    pub async fn create_budget(
        &self,
        ctx: &RequestContext,
        budget: fincore_db::types::Budget,
    ) -> Result<fincore_db::types::Budget, fincore_error::Error> {
        let mut tx = self.begin().await?;
        let result = fincore_budgets::create(&mut tx, &budget).await.map(|()| budget);
        self.finish(tx, ctx, "budget.create", "BUDGET", result).await
    }

    pub async fn list_budgets(&self, ctx: &RequestContext) -> Result<Vec<fincore_db::types::Budget>, BudgetError> {
        let mut tx = self.gateway.begin().await.map_err(BudgetError::Db)?;
        fincore_budgets::list(&mut tx, ctx.user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fincore_db::queries::{audit, users};

    async fn coordinator_with_user() -> (Coordinator, Uuid) {
        let gateway = Gateway::connect("sqlite::memory:", 1).await.unwrap();
        gateway.apply_schema().await.unwrap();
        let user_id = Uuid::new_v4();
        let mut tx = gateway.begin().await.unwrap();
        users::create(&mut *tx, user_id, 2_000_000, 20_000_000).await.unwrap();
        users::adjust_balance(&mut *tx, user_id, 100_000).await.unwrap();
        tx.commit().await.unwrap();
        (Coordinator::new(gateway), user_id)
    }

    fn ctx(user_id: Uuid) -> RequestContext {
        RequestContext {
            user_id,
            request_id: Uuid::new_v4().to_string(),
            ip_address: None,
            user_agent: None,
            now: Utc::now(),
        }
    }

    #[tokio::test]
    async fn successful_deposit_commits_and_audits() {
        let (coordinator, user_id) = coordinator_with_user().await;
        let request_ctx = ctx(user_id);
        let transfer = coordinator.deposit(&request_ctx, 5_000).await.unwrap();
        assert_eq!(transfer.amount_cents, 5_000);

        let entries = audit::list_for_user(coordinator.gateway().pool(), user_id, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "transfer.deposit");
        assert_eq!(entries[0].status, AuditStatus::Success);
    }

    #[tokio::test]
    async fn failed_pix_still_records_a_failure_entry() {
        let (coordinator, user_id) = coordinator_with_user().await;
        let request_ctx = ctx(user_id);
        let input = PixInput {
            pix_key: "not-an-email".to_string(),
            pix_key_type: fincore_validators::PixKeyKind::Email,
            amount_cents: 1_000,
            description: None,
        };
        let result = coordinator.pix(&request_ctx, input).await;
        assert!(result.is_err());

        let entries = audit::list_for_user(coordinator.gateway().pool(), user_id, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, AuditStatus::Failure);
        assert_eq!(entries[0].new_values, serde_json::Value::Null);
    }
}
