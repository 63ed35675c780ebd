//! Exercises the query layer against an in-memory sqlite database,
//! mirroring the dual-backend harness `util/rich-indexer` uses for its
//! own store tests.

use chrono::Utc;
use fincore_db::queries::{transfers, users};
use fincore_db::types::{Transfer, TransferStatus, TransferType};
use fincore_db::Gateway;
use uuid::Uuid;

async fn memory_gateway() -> Gateway {
    let gateway = Gateway::connect("sqlite::memory:", 1).await.expect("connect");
    gateway.apply_schema().await.expect("apply schema");
    gateway
}

#[tokio::test]
async fn create_and_fetch_user_round_trips() {
    let gateway = memory_gateway().await;
    let id = Uuid::new_v4();
    users::create(gateway.pool(), id, 2_000_000, 20_000_000).await.unwrap();

    let user = users::get(gateway.pool(), id).await.unwrap().unwrap();
    assert_eq!(user.balance_cents, 0);
    assert_eq!(user.daily_transfer_limit_cents, 2_000_000);
}

#[tokio::test]
async fn adjust_balance_is_additive_under_concurrent_transactions() {
    let gateway = memory_gateway().await;
    let id = Uuid::new_v4();
    users::create(gateway.pool(), id, 2_000_000, 20_000_000).await.unwrap();

    let mut tx = gateway.begin().await.unwrap();
    users::get_for_update(&mut *tx, gateway.backend(), id).await.unwrap();
    users::adjust_balance(&mut *tx, id, 1_000).await.unwrap();
    users::adjust_balance(&mut *tx, id, -200).await.unwrap();
    tx.commit().await.unwrap();

    let user = users::get(gateway.pool(), id).await.unwrap().unwrap();
    assert_eq!(user.balance_cents, 800);
}

#[tokio::test]
async fn transfer_lifecycle_persists_completion() {
    let gateway = memory_gateway().await;
    let sender = Uuid::new_v4();
    users::create(gateway.pool(), sender, 2_000_000, 20_000_000).await.unwrap();

    let transfer = Transfer {
        id: Uuid::new_v4(),
        user_id: sender,
        transfer_type: TransferType::Pix,
        status: TransferStatus::Pending,
        amount_cents: 5_000,
        fee_cents: 0,
        created_at: Utc::now(),
        completed_at: None,
        failure_reason: None,
        pix_key: Some("someone@example.com".to_string()),
        pix_key_type: Some(fincore_db::types::PixKeyType::Email),
        recipient_name: Some("Someone".to_string()),
        recipient_document: None,
        recipient_bank: None,
        recipient_branch: None,
        recipient_account: None,
        recipient_account_type: None,
        recipient_user_id: None,
        description: None,
    };
    transfers::create(gateway.pool(), &transfer).await.unwrap();
    transfers::mark_completed(gateway.pool(), transfer.id, Utc::now()).await.unwrap();

    let stored = transfers::get(gateway.pool(), transfer.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TransferStatus::Completed);
    assert!(stored.completed_at.is_some());
}

#[tokio::test]
async fn sum_completed_spend_excludes_deposits_and_pending() {
    let gateway = memory_gateway().await;
    let user = Uuid::new_v4();
    users::create(gateway.pool(), user, 2_000_000, 20_000_000).await.unwrap();

    let mut completed_pix = base_transfer(user, TransferType::Pix, TransferStatus::Pending, 10_000);
    transfers::create(gateway.pool(), &completed_pix).await.unwrap();
    transfers::mark_completed(gateway.pool(), completed_pix.id, Utc::now()).await.unwrap();
    completed_pix.status = TransferStatus::Completed;

    let deposit = base_transfer(user, TransferType::Deposit, TransferStatus::Pending, 50_000);
    transfers::create(gateway.pool(), &deposit).await.unwrap();
    transfers::mark_completed(gateway.pool(), deposit.id, Utc::now()).await.unwrap();

    let pending = base_transfer(user, TransferType::Ted, TransferStatus::Pending, 7_000);
    transfers::create(gateway.pool(), &pending).await.unwrap();

    let since = Utc::now() - chrono::Duration::hours(1);
    let total = transfers::sum_completed_spend_since(gateway.pool(), user, since).await.unwrap();
    assert_eq!(total, 10_000);
}

fn base_transfer(user: Uuid, transfer_type: TransferType, status: TransferStatus, amount_cents: i64) -> Transfer {
    Transfer {
        id: Uuid::new_v4(),
        user_id: user,
        transfer_type,
        status,
        amount_cents,
        fee_cents: 0,
        created_at: Utc::now(),
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
