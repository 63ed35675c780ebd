//! Transfer engine (spec.md §4.6): PIX, TED, P2P (immediate and
//! request/approve/reject), deposit and cancel, all built on the
//! canonical locked flow —
//!
//! ```text
//! begin tx
//!   user := select user for update
//!   if user.status != active: fail
//!   if user.balance < amount+fee: fail InsufficientBalance
//!   if daily_spent + amount+fee > user.daily: fail DailyLimitExceeded
//!   if monthly_spent + amount+fee > user.monthly: fail MonthlyLimitExceeded
//!   user.balance -= amount+fee
//!   transfer := insert(type, status=completed, completed_at=now)
//! commit
//! ```
//!
//! P2P locks both endpoints in **ascending user-id order** to rule out
//! deadlock against the reverse transfer (spec.md §9 redesign).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use fincore_db::pool::Backend;
use fincore_db::queries::{transfers, users};
use fincore_db::types::{BankAccountType, PixKeyType, Transfer, TransferStatus, TransferType, User};
use fincore_limits::{user_remaining, Window};
use fincore_validators::{validate_pix_key, PixKeyKind};

const TED_FEE_CENTS: i64 = 1_000;

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("user not found")]
    UserNotFound,
    #[error("user account is frozen")]
    UserFrozen,
    #[error("transfer not found")]
    TransferNotFound,
    #[error("caller does not own this transfer")]
    Unauthorized,
    #[error("amount must be a positive number of cents")]
    InvalidAmount,
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("daily transfer limit exceeded")]
    DailyLimitExceeded,
    #[error("monthly transfer limit exceeded")]
    MonthlyLimitExceeded,
    #[error("a transfer cannot target the sender")]
    CannotTransferToSelf,
    #[error("transfer is not in a cancellable/approvable state")]
    InvalidStatusTransition,
    #[error(transparent)]
    Validation(#[from] fincore_validators::ValidationError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl From<TransferError> for fincore_error::Error {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::UserNotFound => fincore_error::Error::user_not_found(),
            TransferError::UserFrozen => fincore_error::Error::validation("BUS_102", "user account is frozen"),
            TransferError::TransferNotFound => fincore_error::Error::transfer_not_found(),
            TransferError::Unauthorized => fincore_error::Error::auth_ownership(),
            TransferError::InvalidAmount => fincore_error::Error::validation("VAL_001", "amount is invalid"),
            TransferError::InsufficientBalance => fincore_error::Error::insufficient_balance(),
            TransferError::DailyLimitExceeded => fincore_error::Error::daily_limit_exceeded(),
            TransferError::MonthlyLimitExceeded => fincore_error::Error::monthly_limit_exceeded(),
            TransferError::CannotTransferToSelf => {
                fincore_error::Error::validation("VAL_009", "a transfer cannot target the sender")
            }
            TransferError::InvalidStatusTransition => fincore_error::Error::invalid_status_transition(),
            TransferError::Validation(v) => v.into(),
            TransferError::Db(e) => fincore_db::map_db_error(e),
        }
    }
}

fn base_transfer(user_id: Uuid, transfer_type: TransferType, amount_cents: i64, fee_cents: i64, now: DateTime<Utc>) -> Transfer {
    Transfer {
        id: Uuid::new_v4(),
        user_id,
        transfer_type,
        status: TransferStatus::Pending,
        amount_cents,
        fee_cents,
        created_at: now,
        completed_at: None,
        failure_reason: None,
        pix_key: None,
        pix_key_type: None,
        recipient_name: None,
        recipient_document: None,
        recipient_bank: None,
        recipient_branch: None,
        recipient_account: None,
        recipient_account_type: None,
        recipient_user_id: None,
        description: None,
    }
}

/// Checks status/balance/limits against a row-locked user and debits
/// `amount_cents + fee_cents`, leaving the transfer ready to insert as
/// `completed`. Callers must have already locked `user` in this
/// transaction.
async fn authorize_and_debit(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    user: &User,
    amount_cents: i64,
    fee_cents: i64,
    now: DateTime<Utc>,
) -> Result<(), TransferError> {
    if amount_cents <= 0 {
        return Err(TransferError::InvalidAmount);
    }
    if user.status != fincore_db::types::UserStatus::Active {
        return Err(TransferError::UserFrozen);
    }
    let total = amount_cents + fee_cents;
    if user.balance_cents < total {
        return Err(TransferError::InsufficientBalance);
    }
    let daily_remaining = user_remaining(&mut *tx, user, Window::Daily, now).await?;
    if total > daily_remaining {
        return Err(TransferError::DailyLimitExceeded);
    }
    let monthly_remaining = user_remaining(&mut *tx, user, Window::Monthly, now).await?;
    if total > monthly_remaining {
        return Err(TransferError::MonthlyLimitExceeded);
    }
    users::adjust_balance(&mut *tx, user.id, -total).await?;
    Ok(())
}

async fn load_active_locked(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    backend: Backend,
    user_id: Uuid,
) -> Result<User, TransferError> {
    users::get_for_update(&mut *tx, backend, user_id).await?.ok_or(TransferError::UserNotFound)
}

pub struct PixInput {
    pub pix_key: String,
    pub pix_key_type: PixKeyKind,
    pub amount_cents: i64,
    pub description: Option<String>,
}

fn to_db_pix_key_type(kind: PixKeyKind) -> PixKeyType {
    match kind {
        PixKeyKind::Cpf => PixKeyType::Cpf,
        PixKeyKind::Cnpj => PixKeyType::Cnpj,
        PixKeyKind::Email => PixKeyType::Email,
        PixKeyKind::Phone => PixKeyType::Phone,
        PixKeyKind::Random => PixKeyType::Random,
    }
}

/// `fee = 0`. The declared key+type shape is validated before the
/// transaction even opens (spec.md §4.6).
pub async fn pix(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    backend: Backend,
    user_id: Uuid,
    input: PixInput,
    now: DateTime<Utc>,
) -> Result<Transfer, TransferError> {
    validate_pix_key(input.pix_key_type, &input.pix_key)?;

    let user = load_active_locked(tx, backend, user_id).await?;
    authorize_and_debit(tx, &user, input.amount_cents, 0, now).await?;

    let mut transfer = base_transfer(user_id, TransferType::Pix, input.amount_cents, 0, now);
    transfer.pix_key = Some(input.pix_key);
    transfer.pix_key_type = Some(to_db_pix_key_type(input.pix_key_type));
    transfer.description = input.description;
    transfer.status = TransferStatus::Completed;
    transfer.completed_at = Some(now);
    transfers::create(&mut *tx, &transfer).await?;
    Ok(transfer)
}

pub struct TedInput {
    pub recipient_name: String,
    pub recipient_document: String,
    pub recipient_bank: String,
    pub recipient_branch: String,
    pub recipient_account: String,
    pub recipient_account_type: String,
    pub amount_cents: i64,
}

fn validate_ted_payload(input: &TedInput) -> Result<BankAccountType, TransferError> {
    if input.recipient_bank.len() != 3 || !input.recipient_bank.bytes().all(|b| b.is_ascii_digit()) {
        return Err(fincore_validators::ValidationError::InvalidAmount.into());
    }
    match input.recipient_account_type.to_ascii_lowercase().as_str() {
        "checking" => Ok(BankAccountType::Checking),
        "savings" => Ok(BankAccountType::Savings),
        _ => Err(fincore_validators::ValidationError::InvalidAmount.into()),
    }
}

/// `fee = 1000` (10,00 BRL), deducted alongside the amount and
/// recorded on the row.
pub async fn ted(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    backend: Backend,
    user_id: Uuid,
    input: TedInput,
    now: DateTime<Utc>,
) -> Result<Transfer, TransferError> {
    let account_type = validate_ted_payload(&input)?;

    let user = load_active_locked(tx, backend, user_id).await?;
    authorize_and_debit(tx, &user, input.amount_cents, TED_FEE_CENTS, now).await?;

    let mut transfer = base_transfer(user_id, TransferType::Ted, input.amount_cents, TED_FEE_CENTS, now);
    transfer.recipient_name = Some(input.recipient_name);
    transfer.recipient_document = Some(input.recipient_document);
    transfer.recipient_bank = Some(input.recipient_bank);
    transfer.recipient_branch = Some(input.recipient_branch);
    transfer.recipient_account = Some(input.recipient_account);
    transfer.recipient_account_type = Some(account_type);
    transfer.status = TransferStatus::Completed;
    transfer.completed_at = Some(now);
    transfers::create(&mut *tx, &transfer).await?;
    Ok(transfer)
}

/// Locks both endpoints in ascending user-id order, then runs the
/// sender's checks and moves both balances. The recorded row belongs
/// to the sender (spec.md §4.6, §9's deadlock-avoidance redesign).
pub async fn p2p_immediate(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    backend: Backend,
    sender_id: Uuid,
    recipient_id: Uuid,
    amount_cents: i64,
    description: Option<String>,
    now: DateTime<Utc>,
) -> Result<Transfer, TransferError> {
    if sender_id == recipient_id {
        return Err(TransferError::CannotTransferToSelf);
    }
    let (first_id, second_id) = if sender_id < recipient_id {
        (sender_id, recipient_id)
    } else {
        (recipient_id, sender_id)
    };
    let first = load_active_locked(tx, backend, first_id).await?;
    let second = load_active_locked(tx, backend, second_id).await?;
    let sender = if first.id == sender_id { &first } else { &second };

    authorize_and_debit(tx, sender, amount_cents, 0, now).await?;
    users::adjust_balance(&mut *tx, recipient_id, amount_cents).await?;

    let mut transfer = base_transfer(sender_id, TransferType::P2p, amount_cents, 0, now);
    transfer.recipient_user_id = Some(recipient_id);
    transfer.description = description;
    transfer.status = TransferStatus::Completed;
    transfer.completed_at = Some(now);
    transfers::create(&mut *tx, &transfer).await?;
    Ok(transfer)
}

/// No balance or limit check; the single sanctioned way to increase a
/// user's balance (spec.md §4.6).
pub async fn deposit(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    user_id: Uuid,
    amount_cents: i64,
    now: DateTime<Utc>,
) -> Result<Transfer, TransferError> {
    if amount_cents <= 0 {
        return Err(TransferError::InvalidAmount);
    }
    users::adjust_balance(&mut *tx, user_id, amount_cents).await?;
    let mut transfer = base_transfer(user_id, TransferType::Deposit, amount_cents, 0, now);
    transfer.status = TransferStatus::Completed;
    transfer.completed_at = Some(now);
    transfers::create(&mut *tx, &transfer).await?;
    Ok(transfer)
}

/// Step 1 of the P2P request flow: the initiator (who will *receive*
/// the money) inserts a pending row with `user_id = payer`. No money
/// moves yet.
pub async fn p2p_request(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    payer_id: Uuid,
    initiator_id: Uuid,
    amount_cents: i64,
    description: Option<String>,
    now: DateTime<Utc>,
) -> Result<Transfer, TransferError> {
    if payer_id == initiator_id {
        return Err(TransferError::CannotTransferToSelf);
    }
    if amount_cents <= 0 {
        return Err(TransferError::InvalidAmount);
    }
    let mut transfer = base_transfer(payer_id, TransferType::P2p, amount_cents, 0, now);
    transfer.recipient_user_id = Some(initiator_id);
    transfer.description = description;
    transfers::create(&mut *tx, &transfer).await?;
    Ok(transfer)
}

/// Step 2, performed by the payer: locks the transfer then both
/// endpoints, runs the payer's checks, and completes the transfer. A
/// request once approved or rejected cannot be re-actioned.
pub async fn p2p_approve(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    backend: Backend,
    payer_id: Uuid,
    transfer_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Transfer, TransferError> {
    let mut transfer = transfers::get(&mut *tx, transfer_id).await?.ok_or(TransferError::TransferNotFound)?;
    if transfer.user_id != payer_id {
        return Err(TransferError::Unauthorized);
    }
    if transfer.status != TransferStatus::Pending {
        return Err(TransferError::InvalidStatusTransition);
    }
    let recipient_id = transfer.recipient_user_id.ok_or(TransferError::InvalidStatusTransition)?;

    let (first_id, second_id) = if payer_id < recipient_id {
        (payer_id, recipient_id)
    } else {
        (recipient_id, payer_id)
    };
    let first = load_active_locked(tx, backend, first_id).await?;
    let second = load_active_locked(tx, backend, second_id).await?;
    let payer = if first.id == payer_id { &first } else { &second };

    authorize_and_debit(tx, payer, transfer.amount_cents, transfer.fee_cents, now).await?;
    users::adjust_balance(&mut *tx, recipient_id, transfer.amount_cents).await?;

    transfers::mark_completed(&mut *tx, transfer.id, now).await?;
    transfer.status = TransferStatus::Completed;
    transfer.completed_at = Some(now);
    Ok(transfer)
}

/// Step 2b: the payer declines. No money moves.
pub async fn p2p_reject(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    payer_id: Uuid,
    transfer_id: Uuid,
) -> Result<Transfer, TransferError> {
    let mut transfer = transfers::get(&mut *tx, transfer_id).await?.ok_or(TransferError::TransferNotFound)?;
    if transfer.user_id != payer_id {
        return Err(TransferError::Unauthorized);
    }
    if transfer.status != TransferStatus::Pending {
        return Err(TransferError::InvalidStatusTransition);
    }
    transfers::mark_cancelled(&mut *tx, transfer.id).await?;
    transfer.status = TransferStatus::Cancelled;
    Ok(transfer)
}

/// Only permitted from `pending`. The only transfers that remain
/// pending in this engine are unapproved P2P requests, which never
/// debited any balance — so cancelling one is a pure status
/// transition, the same effect as [`p2p_reject`], with no refund to
/// compute.
pub async fn cancel(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    caller_id: Uuid,
    transfer_id: Uuid,
) -> Result<Transfer, TransferError> {
    let mut transfer = transfers::get(&mut *tx, transfer_id).await?.ok_or(TransferError::TransferNotFound)?;
    if transfer.user_id != caller_id {
        return Err(TransferError::Unauthorized);
    }
    if transfer.status != TransferStatus::Pending {
        return Err(TransferError::InvalidStatusTransition);
    }
    transfers::mark_cancelled(&mut *tx, transfer.id).await?;
    transfer.status = TransferStatus::Cancelled;
    Ok(transfer)
}

pub async fn list(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<Transfer>, TransferError> {
    Ok(transfers::list_for_user(&mut *tx, user_id, limit).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fincore_db::Gateway;

    async fn gateway_with_users(balances: &[(Uuid, i64)]) -> Gateway {
        let gateway = Gateway::connect("sqlite::memory:", 1).await.unwrap();
        gateway.apply_schema().await.unwrap();
        let mut tx = gateway.begin().await.unwrap();
        for (id, balance) in balances {
            users::create(&mut *tx, *id, 2_000_000, 20_000_000).await.unwrap();
            users::adjust_balance(&mut *tx, *id, *balance).await.unwrap();
        }
        tx.commit().await.unwrap();
        gateway
    }

    #[tokio::test]
    async fn happy_pix_debits_exactly_the_amount() {
        let sender = Uuid::new_v4();
        let gateway = gateway_with_users(&[(sender, 100_000)]).await;

        let mut tx = gateway.begin().await.unwrap();
        let input = PixInput {
            pix_key: "alice@example.com".to_string(),
            pix_key_type: PixKeyKind::Email,
            amount_cents: 15_000,
            description: None,
        };
        let transfer = pix(&mut tx, gateway.backend(), sender, input, Utc::now()).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(transfer.status, TransferStatus::Completed);
        let user = users::get(gateway.pool(), sender).await.unwrap().unwrap();
        assert_eq!(user.balance_cents, 85_000);
    }

    #[tokio::test]
    async fn insufficient_balance_leaves_balance_untouched() {
        let sender = Uuid::new_v4();
        let gateway = gateway_with_users(&[(sender, 100_000)]).await;

        let mut tx = gateway.begin().await.unwrap();
        let input = PixInput {
            pix_key: "alice@example.com".to_string(),
            pix_key_type: PixKeyKind::Email,
            amount_cents: 500_000,
            description: None,
        };
        let result = pix(&mut tx, gateway.backend(), sender, input, Utc::now()).await;
        assert!(matches!(result, Err(TransferError::InsufficientBalance)));
        tx.rollback().await.unwrap();

        let user = users::get(gateway.pool(), sender).await.unwrap().unwrap();
        assert_eq!(user.balance_cents, 100_000);
    }

    #[tokio::test]
    async fn p2p_immediate_moves_money_both_ways() {
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        let gateway = gateway_with_users(&[(u1, 100_000), (u2, 100_000)]).await;

        let mut tx = gateway.begin().await.unwrap();
        p2p_immediate(&mut tx, gateway.backend(), u1, u2, 10_000, None, Utc::now()).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(users::get(gateway.pool(), u1).await.unwrap().unwrap().balance_cents, 90_000);
        assert_eq!(users::get(gateway.pool(), u2).await.unwrap().unwrap().balance_cents, 110_000);
    }

    #[tokio::test]
    async fn p2p_to_self_is_rejected() {
        let u1 = Uuid::new_v4();
        let gateway = gateway_with_users(&[(u1, 100_000)]).await;
        let mut tx = gateway.begin().await.unwrap();
        let result = p2p_immediate(&mut tx, gateway.backend(), u1, u1, 1_000, None, Utc::now()).await;
        assert!(matches!(result, Err(TransferError::CannotTransferToSelf)));
    }

    #[tokio::test]
    async fn p2p_request_then_approve_settles_funds() {
        let payer = Uuid::new_v4();
        let initiator = Uuid::new_v4();
        let gateway = gateway_with_users(&[(payer, 100_000), (initiator, 0)]).await;

        let mut tx = gateway.begin().await.unwrap();
        let request = p2p_request(&mut tx, payer, initiator, 5_000, None, Utc::now()).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(request.status, TransferStatus::Pending);

        let mut tx = gateway.begin().await.unwrap();
        let approved = p2p_approve(&mut tx, gateway.backend(), payer, request.id, Utc::now()).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(approved.status, TransferStatus::Completed);
        assert_eq!(users::get(gateway.pool(), payer).await.unwrap().unwrap().balance_cents, 95_000);
        assert_eq!(users::get(gateway.pool(), initiator).await.unwrap().unwrap().balance_cents, 5_000);
    }

    #[tokio::test]
    async fn cancelling_a_completed_transfer_fails() {
        let sender = Uuid::new_v4();
        let gateway = gateway_with_users(&[(sender, 100_000)]).await;

        let mut tx = gateway.begin().await.unwrap();
        let transfer = deposit(&mut tx, sender, 1_000, Utc::now()).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = gateway.begin().await.unwrap();
        let result = cancel(&mut tx, sender, transfer.id).await;
        assert!(matches!(result, Err(TransferError::InvalidStatusTransition)));
    }
}
