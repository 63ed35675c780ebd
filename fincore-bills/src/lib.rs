//! Bill payer (spec.md §4.7): runs the canonical transfer-flow checks at
//! `fee = 0` against a barcode-derived amount, then records a `Bill`
//! row. The barcode column is `UNIQUE`, so a second payment of the same
//! barcode is rejected before ever touching the balance.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use fincore_db::pool::Backend;
use fincore_db::queries::{bills, transfers, users};
use fincore_db::types::{Bill, BillStatus, Transfer, TransferStatus, TransferType, User};
use fincore_limits::{user_remaining, Window};
use fincore_validators::validate_barcode;

#[derive(Debug, thiserror::Error)]
pub enum BillError {
    #[error("user not found")]
    UserNotFound,
    #[error("user account is frozen")]
    UserFrozen,
    #[error("bill not found")]
    BillNotFound,
    #[error("this barcode has already been paid")]
    BillAlreadyPaid,
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("daily transfer limit exceeded")]
    DailyLimitExceeded,
    #[error("monthly transfer limit exceeded")]
    MonthlyLimitExceeded,
    #[error(transparent)]
    Validation(#[from] fincore_validators::ValidationError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl From<BillError> for fincore_error::Error {
    fn from(e: BillError) -> Self {
        match e {
            BillError::UserNotFound => fincore_error::Error::user_not_found(),
            BillError::UserFrozen => fincore_error::Error::validation("BUS_102", "user account is frozen"),
            BillError::BillNotFound => fincore_error::Error::not_found(),
            BillError::BillAlreadyPaid => fincore_error::Error::validation("BUS_104", "bill already paid"),
            BillError::InsufficientBalance => fincore_error::Error::insufficient_balance(),
            BillError::DailyLimitExceeded => fincore_error::Error::daily_limit_exceeded(),
            BillError::MonthlyLimitExceeded => fincore_error::Error::monthly_limit_exceeded(),
            BillError::Validation(v) => v.into(),
            BillError::Db(e) => fincore_db::map_db_error(e),
        }
    }
}

async fn authorize_and_debit(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    user: &User,
    amount_cents: i64,
    now: DateTime<Utc>,
) -> Result<(), BillError> {
    if user.status != fincore_db::types::UserStatus::Active {
        return Err(BillError::UserFrozen);
    }
    if user.balance_cents < amount_cents {
        return Err(BillError::InsufficientBalance);
    }
    let daily_remaining = user_remaining(&mut *tx, user, Window::Daily, now).await?;
    if amount_cents > daily_remaining {
        return Err(BillError::DailyLimitExceeded);
    }
    let monthly_remaining = user_remaining(&mut *tx, user, Window::Monthly, now).await?;
    if amount_cents > monthly_remaining {
        return Err(BillError::MonthlyLimitExceeded);
    }
    users::adjust_balance(&mut *tx, user.id, -amount_cents).await?;
    Ok(())
}

/// Validates the barcode (shape, checksum, encoded amount), rejects a
/// replay, then runs the debit and inserts the paid `Bill` row plus a
/// completed `Transfer` row — all in the caller's transaction. The
/// transfer row is what makes the payment count against the sender's
/// daily/monthly spend limits (spec.md §4.7): `fincore-limits` only
/// scans `transfers`, so a boleto with no matching row there would be
/// invisible to the same checks `pix`/`ted`/`p2p` are subject to.
pub async fn pay(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    backend: Backend,
    user_id: Uuid,
    barcode: &str,
    recipient_name: String,
    due_date: chrono::NaiveDate,
    now: DateTime<Utc>,
) -> Result<Bill, BillError> {
    let amount_cents = validate_barcode(barcode)?;

    if bills::get_by_barcode(&mut *tx, barcode).await?.is_some() {
        return Err(BillError::BillAlreadyPaid);
    }

    let user = users::get_for_update(&mut *tx, backend, user_id).await?.ok_or(BillError::UserNotFound)?;
    authorize_and_debit(tx, &user, amount_cents, now).await?;

    let bill = Bill {
        id: Uuid::new_v4(),
        user_id,
        barcode: barcode.to_string(),
        amount_cents,
        fee_cents: 0,
        final_amount_cents: amount_cents,
        status: BillStatus::Paid,
        recipient_name,
        due_date,
        paid_at: Some(now),
    };
    bills::create(&mut *tx, &bill).await?;

    let ledger_entry = Transfer {
        id: Uuid::new_v4(),
        user_id,
        transfer_type: TransferType::Bill,
        status: TransferStatus::Completed,
        amount_cents,
        fee_cents: 0,
        created_at: now,
        completed_at: Some(now),
        failure_reason: None,
        pix_key: None,
        pix_key_type: None,
        recipient_name: Some(bill.recipient_name.clone()),
        recipient_document: None,
        recipient_bank: None,
        recipient_branch: None,
        recipient_account: None,
        recipient_account_type: None,
        recipient_user_id: None,
        description: Some(format!("boleto {barcode}")),
    };
    transfers::create(&mut *tx, &ledger_entry).await?;

    Ok(bill)
}

pub async fn list(tx: &mut sqlx::Transaction<'_, sqlx::Any>, user_id: Uuid) -> Result<Vec<Bill>, BillError> {
    Ok(bills::list_for_user(&mut *tx, user_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fincore_db::Gateway;
    use fincore_db::queries::users;

    const VALID_BARCODE: &str = "34191100000000150001234567890123456789012345";

    async fn gateway_with_user(balance_cents: i64) -> (Gateway, Uuid) {
        let gateway = Gateway::connect("sqlite::memory:", 1).await.unwrap();
        gateway.apply_schema().await.unwrap();
        let user_id = Uuid::new_v4();
        let mut tx = gateway.begin().await.unwrap();
        users::create(&mut *tx, user_id, 2_000_000, 20_000_000).await.unwrap();
        users::adjust_balance(&mut *tx, user_id, balance_cents).await.unwrap();
        tx.commit().await.unwrap();
        (gateway, user_id)
    }

    #[tokio::test]
    async fn paying_a_valid_barcode_debits_its_encoded_amount() {
        let (gateway, user_id) = gateway_with_user(100_000).await;
        let mut tx = gateway.begin().await.unwrap();
        let bill = pay(
            &mut tx,
            gateway.backend(),
            user_id,
            VALID_BARCODE,
            "Acme Utilities".to_string(),
            chrono::Utc::now().date_naive(),
            Utc::now(),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(bill.amount_cents, 15_000);
        assert_eq!(bill.status, BillStatus::Paid);
        let user = users::get(gateway.pool(), user_id).await.unwrap().unwrap();
        assert_eq!(user.balance_cents, 85_000);
    }

    #[tokio::test]
    async fn replaying_a_paid_barcode_is_rejected() {
        let (gateway, user_id) = gateway_with_user(100_000).await;
        let mut tx = gateway.begin().await.unwrap();
        pay(
            &mut tx,
            gateway.backend(),
            user_id,
            VALID_BARCODE,
            "Acme Utilities".to_string(),
            chrono::Utc::now().date_naive(),
            Utc::now(),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let mut tx = gateway.begin().await.unwrap();
        let result = pay(
            &mut tx,
            gateway.backend(),
            user_id,
            VALID_BARCODE,
            "Acme Utilities".to_string(),
            chrono::Utc::now().date_naive(),
            Utc::now(),
        )
        .await;
        assert!(matches!(result, Err(BillError::BillAlreadyPaid)));
    }

    #[tokio::test]
    async fn insufficient_balance_blocks_the_payment() {
        let (gateway, user_id) = gateway_with_user(1_000).await;
        let mut tx = gateway.begin().await.unwrap();
        let result = pay(
            &mut tx,
            gateway.backend(),
            user_id,
            VALID_BARCODE,
            "Acme Utilities".to_string(),
            chrono::Utc::now().date_naive(),
            Utc::now(),
        )
        .await;
        assert!(matches!(result, Err(BillError::InsufficientBalance)));
    }
}
