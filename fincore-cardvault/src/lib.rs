//! Card vault (spec.md §4.5): issuance, lifecycle management and
//! transaction processing. Every operation other than [`verify_pin`]
//! asserts that the caller owns the card before touching it, and none
//! of them ever logs, returns, or embeds in an error the plaintext
//! card number, CVV, or PIN.

use chrono::{DateTime, Datelike, Duration, Utc};
use uuid::Uuid;

use fincore_config::Argon2Params;
use fincore_db::pool::Backend;
use fincore_db::queries::{card_transactions, cards};
use fincore_db::types::{Card, CardBrand, CardStatus, CardTransaction, CardType as DbCardType};
use fincore_limits::{card_remaining, Window};
use fincore_validators::{
    card_type_from_str, generate_card_number, passes_luhn, validate_brand_str, validate_cvv, validate_pin_format,
    weak_pin, Brand, CardType,
};

const DEFAULT_DAILY_LIMIT_CENTS: i64 = 500_000;
const DEFAULT_MONTHLY_LIMIT_CENTS: i64 = 5_000_000;
const PHYSICAL_VALIDITY_DAYS: i64 = 365 * 5;
const VIRTUAL_VALIDITY_DAYS: i64 = 365 * 3;

#[derive(Debug, thiserror::Error)]
pub enum CardVaultError {
    #[error("caller does not own this card")]
    Unauthorized,
    #[error("card not found")]
    NotFound,
    #[error("card is blocked")]
    Blocked,
    #[error("card is cancelled")]
    Cancelled,
    #[error("card has expired")]
    Expired,
    #[error(transparent)]
    Validation(#[from] fincore_validators::ValidationError),
    #[error(transparent)]
    Crypto(#[from] fincore_crypto::CryptoError),
    #[error("current PIN does not match")]
    PinMismatch,
    #[error("no PIN is set for this card")]
    PinNotSet,
    #[error("PIN is too predictable")]
    PinWeak,
    #[error("daily card limit exceeded")]
    DailyLimitExceeded,
    #[error("monthly card limit exceeded")]
    MonthlyLimitExceeded,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl From<CardVaultError> for fincore_error::Error {
    fn from(e: CardVaultError) -> Self {
        match e {
            CardVaultError::Unauthorized => fincore_error::Error::auth_ownership(),
            CardVaultError::NotFound => fincore_error::Error::card_not_found(),
            CardVaultError::Blocked => fincore_error::Error::card_blocked(),
            CardVaultError::Cancelled => fincore_error::Error::card_cancelled(),
            CardVaultError::Expired => fincore_error::Error::card_expired(),
            CardVaultError::PinMismatch => fincore_error::Error::pin_mismatch(),
            CardVaultError::PinNotSet => fincore_error::Error::pin_not_set(),
            CardVaultError::PinWeak => fincore_error::Error::pin_weak(),
            CardVaultError::DailyLimitExceeded => fincore_error::Error::daily_limit_exceeded(),
            CardVaultError::MonthlyLimitExceeded => fincore_error::Error::monthly_limit_exceeded(),
            CardVaultError::Validation(v) => v.into(),
            CardVaultError::Crypto(c) => c.into(),
            CardVaultError::Db(e) => fincore_db::map_db_error(e),
        }
    }
}

pub struct CreateCardInput {
    pub card_type: String,
    pub brand: String,
    pub card_number: Option<String>,
    pub cvv: String,
    pub pin: Option<String>,
    pub holder_name: String,
    pub daily_limit_cents: Option<i64>,
    pub monthly_limit_cents: Option<i64>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CardDetails {
    pub id: Uuid,
    pub masked_number: String,
    pub card_type: String,
    pub brand: String,
    pub status: String,
    pub holder_name: String,
    pub expiry_month: i32,
    pub expiry_year: i32,
    pub daily_limit_cents: i64,
    pub monthly_limit_cents: i64,
    pub current_daily_spent_cents: i64,
    pub current_monthly_spent_cents: i64,
    pub is_contactless: bool,
    pub is_international: bool,
    pub block_international: bool,
    pub block_online: bool,
    pub has_pin: bool,
}

fn mask(last_four: &str) -> String {
    format!("**** **** **** {last_four}")
}

/// Projects a row plus its rolling daily/monthly spend (derived from
/// `card_transactions`, not a stored counter — see [`card_remaining`])
/// into the shape callers get back.
async fn to_details(
    exec: &mut sqlx::Transaction<'_, sqlx::Any>,
    card: &Card,
    now: DateTime<Utc>,
) -> Result<CardDetails, CardVaultError> {
    let current_daily_spent_cents = card.daily_limit_cents - card_remaining(&mut *exec, Window::Daily, card.daily_limit_cents, card.id, now).await?;
    let current_monthly_spent_cents =
        card.monthly_limit_cents - card_remaining(&mut *exec, Window::Monthly, card.monthly_limit_cents, card.id, now).await?;
    Ok(CardDetails {
        id: card.id,
        masked_number: mask(&card.last_four),
        card_type: card.card_type.as_str().to_string(),
        brand: card.brand.as_str().to_string(),
        status: card.status.as_str().to_string(),
        holder_name: card.holder_name.clone(),
        expiry_month: card.expiry_month,
        expiry_year: card.expiry_year,
        daily_limit_cents: card.daily_limit_cents,
        monthly_limit_cents: card.monthly_limit_cents,
        current_daily_spent_cents,
        current_monthly_spent_cents,
        is_contactless: card.is_contactless,
        is_international: card.is_international,
        block_international: card.block_international,
        block_online: card.block_online,
        has_pin: card.pin_hash.is_some(),
    })
}

fn to_db_brand(brand: Brand) -> CardBrand {
    match brand {
        Brand::Visa => CardBrand::Visa,
        Brand::Mastercard => CardBrand::Mastercard,
        Brand::Elo => CardBrand::Elo,
    }
}

fn to_db_card_type(card_type: CardType) -> DbCardType {
    match card_type {
        CardType::Physical => DbCardType::Physical,
        CardType::Virtual => DbCardType::Virtual,
    }
}

fn assert_owned(card: &Card, user_id: Uuid) -> Result<(), CardVaultError> {
    if card.user_id == user_id {
        Ok(())
    } else {
        Err(CardVaultError::Unauthorized)
    }
}

async fn load_owned(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    backend: Backend,
    user_id: Uuid,
    card_id: Uuid,
) -> Result<Card, CardVaultError> {
    let card = cards::get_for_update(&mut *tx, backend, card_id)
        .await?
        .ok_or(CardVaultError::NotFound)?;
    assert_owned(&card, user_id)?;
    Ok(card)
}

pub async fn create(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    aes_key: &[u8; 32],
    argon2_params: Argon2Params,
    user_id: Uuid,
    input: CreateCardInput,
    now: DateTime<Utc>,
) -> Result<CardDetails, CardVaultError> {
    let brand = validate_brand_str(&input.brand)?;
    let card_type = card_type_from_str(&input.card_type)?;
    validate_cvv(&input.cvv)?;

    if let Some(pin) = &input.pin {
        validate_pin_format(pin)?;
        if weak_pin(pin) {
            return Err(CardVaultError::PinWeak);
        }
    }

    let plaintext_number = match &input.card_number {
        Some(n) if passes_luhn(n) => n.clone(),
        Some(_) => return Err(fincore_validators::ValidationError::InvalidCardNumber.into()),
        None => generate_card_number(brand)?,
    };
    let last_four = plaintext_number[plaintext_number.len() - 4..].to_string();

    let daily_limit_cents = input.daily_limit_cents.unwrap_or(DEFAULT_DAILY_LIMIT_CENTS);
    let monthly_limit_cents = input.monthly_limit_cents.unwrap_or(DEFAULT_MONTHLY_LIMIT_CENTS);
    if daily_limit_cents < 0 || monthly_limit_cents < 0 {
        return Err(fincore_validators::ValidationError::InvalidAmount.into());
    }

    let card_number_ct = fincore_crypto::encrypt(plaintext_number.as_bytes(), aes_key)?;
    let cvv_ct = fincore_crypto::encrypt(input.cvv.as_bytes(), aes_key)?;
    let pin_hash = input
        .pin
        .as_deref()
        .map(|p| fincore_crypto::hash_pin(p, argon2_params))
        .transpose()?;

    let validity_days = match card_type {
        CardType::Physical => PHYSICAL_VALIDITY_DAYS,
        CardType::Virtual => VIRTUAL_VALIDITY_DAYS,
    };
    let expires_at = now + Duration::days(validity_days);

    let card = Card {
        id: Uuid::new_v4(),
        user_id,
        card_type: to_db_card_type(card_type),
        brand: to_db_brand(brand),
        status: CardStatus::Active,
        card_number_ct,
        cvv_ct,
        pin_hash,
        last_four,
        holder_name: input.holder_name,
        expiry_month: expires_at.month() as i32,
        expiry_year: expires_at.year(),
        daily_limit_cents,
        monthly_limit_cents,
        is_contactless: true,
        is_international: false,
        block_international: false,
        block_online: false,
        created_at: now,
        expires_at,
        blocked_at: None,
    };
    cards::create(&mut *tx, &card).await?;
    to_details(tx, &card, now).await
}

pub async fn get_details(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    user_id: Uuid,
    card_id: Uuid,
    now: DateTime<Utc>,
) -> Result<CardDetails, CardVaultError> {
    let card = cards::get(&mut *tx, card_id).await?.ok_or(CardVaultError::NotFound)?;
    assert_owned(&card, user_id)?;
    to_details(tx, &card, now).await
}

pub async fn list(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<CardDetails>, CardVaultError> {
    let rows = cards::list_for_user(&mut *tx, user_id).await?;
    let mut details = Vec::with_capacity(rows.len());
    for card in &rows {
        details.push(to_details(&mut *tx, card, now).await?);
    }
    Ok(details)
}

/// Idempotent: blocking an already-blocked card succeeds without effect.
pub async fn block(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    backend: Backend,
    user_id: Uuid,
    card_id: Uuid,
    now: DateTime<Utc>,
) -> Result<CardDetails, CardVaultError> {
    let mut card = load_owned(tx, backend, user_id, card_id).await?;
    if card.status == CardStatus::Cancelled {
        return Err(CardVaultError::Cancelled);
    }
    if card.status != CardStatus::Blocked {
        cards::set_status(&mut *tx, card.id, CardStatus::Blocked, Some(now)).await?;
        card.status = CardStatus::Blocked;
        card.blocked_at = Some(now);
    }
    to_details(tx, &card, now).await
}

/// Unblocking a cancelled card fails with `CardCancelled` (spec.md §4.5).
pub async fn unblock(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    backend: Backend,
    user_id: Uuid,
    card_id: Uuid,
    now: DateTime<Utc>,
) -> Result<CardDetails, CardVaultError> {
    let mut card = load_owned(tx, backend, user_id, card_id).await?;
    if card.status == CardStatus::Cancelled {
        return Err(CardVaultError::Cancelled);
    }
    if card.status != CardStatus::Active {
        cards::set_status(&mut *tx, card.id, CardStatus::Active, None).await?;
        card.status = CardStatus::Active;
        card.blocked_at = None;
    }
    to_details(tx, &card, now).await
}

pub async fn update_limits(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    backend: Backend,
    user_id: Uuid,
    card_id: Uuid,
    daily_limit_cents: i64,
    monthly_limit_cents: i64,
    now: DateTime<Utc>,
) -> Result<CardDetails, CardVaultError> {
    if daily_limit_cents < 0 || monthly_limit_cents < 0 {
        return Err(fincore_validators::ValidationError::InvalidAmount.into());
    }
    let mut card = load_owned(tx, backend, user_id, card_id).await?;
    cards::set_limits(&mut *tx, card.id, daily_limit_cents, monthly_limit_cents).await?;
    card.daily_limit_cents = daily_limit_cents;
    card.monthly_limit_cents = monthly_limit_cents;
    to_details(tx, &card, now).await
}

pub struct SecuritySettings {
    pub is_contactless: bool,
    pub is_international: bool,
    pub block_international: bool,
    pub block_online: bool,
}

pub async fn update_security_settings(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    backend: Backend,
    user_id: Uuid,
    card_id: Uuid,
    settings: SecuritySettings,
    now: DateTime<Utc>,
) -> Result<CardDetails, CardVaultError> {
    let mut card = load_owned(tx, backend, user_id, card_id).await?;
    cards::set_security_settings(
        &mut *tx,
        card.id,
        settings.is_contactless,
        settings.is_international,
        settings.block_international,
        settings.block_online,
    )
    .await?;
    card.is_contactless = settings.is_contactless;
    card.is_international = settings.is_international;
    card.block_international = settings.block_international;
    card.block_online = settings.block_online;
    to_details(tx, &card, now).await
}

/// If the card already has a PIN, `current_pin` must verify against it
/// first (spec.md §4.5). The new PIN is format- and weakness-checked.
pub async fn set_pin(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    backend: Backend,
    argon2_params: Argon2Params,
    user_id: Uuid,
    card_id: Uuid,
    new_pin: &str,
    current_pin: Option<&str>,
) -> Result<(), CardVaultError> {
    let card = load_owned(tx, backend, user_id, card_id).await?;

    if let Some(existing_hash) = &card.pin_hash {
        let presented = current_pin.ok_or(CardVaultError::PinMismatch)?;
        if !fincore_crypto::verify_pin(presented, existing_hash)? {
            return Err(CardVaultError::PinMismatch);
        }
    }

    validate_pin_format(new_pin)?;
    if weak_pin(new_pin) {
        return Err(CardVaultError::PinWeak);
    }
    let hash = fincore_crypto::hash_pin(new_pin, argon2_params)?;
    cards::set_pin_hash(&mut *tx, card.id, &hash).await?;
    Ok(())
}

/// The one operation that skips the ownership check (spec.md §4.5);
/// callers already hold a card id scoped to the transaction at hand.
pub async fn verify_pin(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    card_id: Uuid,
    pin: &str,
) -> Result<bool, CardVaultError> {
    let card = cards::get(&mut *tx, card_id).await?.ok_or(CardVaultError::NotFound)?;
    let hash = card.pin_hash.ok_or(CardVaultError::PinNotSet)?;
    Ok(fincore_crypto::verify_pin(pin, &hash)?)
}

pub async fn cancel(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    backend: Backend,
    user_id: Uuid,
    card_id: Uuid,
    now: DateTime<Utc>,
) -> Result<CardDetails, CardVaultError> {
    let mut card = load_owned(tx, backend, user_id, card_id).await?;
    cards::set_status(&mut *tx, card.id, CardStatus::Cancelled, card.blocked_at).await?;
    card.status = CardStatus::Cancelled;
    to_details(tx, &card, now).await
}

/// Enforces status, expiry and per-card spend limits (derived from
/// `card_transactions`, a rolling window rather than a counter that
/// would need its own reset job — see [`card_remaining`]), then records
/// the transaction.
pub async fn process_transaction(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    backend: Backend,
    card_id: Uuid,
    amount_cents: i64,
    merchant_name: String,
    merchant_category: String,
    now: DateTime<Utc>,
) -> Result<CardTransaction, CardVaultError> {
    if amount_cents <= 0 {
        return Err(fincore_validators::ValidationError::InvalidAmount.into());
    }
    let card = cards::get_for_update(&mut *tx, backend, card_id).await?.ok_or(CardVaultError::NotFound)?;
    match card.status {
        CardStatus::Blocked => return Err(CardVaultError::Blocked),
        CardStatus::Cancelled => return Err(CardVaultError::Cancelled),
        CardStatus::Active => {}
    }
    if card.expires_at < now {
        return Err(CardVaultError::Expired);
    }

    let daily_remaining = card_remaining(&mut *tx, Window::Daily, card.daily_limit_cents, card.id, now).await?;
    if amount_cents > daily_remaining {
        return Err(CardVaultError::DailyLimitExceeded);
    }
    let monthly_remaining = card_remaining(&mut *tx, Window::Monthly, card.monthly_limit_cents, card.id, now).await?;
    if amount_cents > monthly_remaining {
        return Err(CardVaultError::MonthlyLimitExceeded);
    }

    let transaction = CardTransaction {
        id: Uuid::new_v4(),
        card_id: card.id,
        user_id: card.user_id,
        amount_cents,
        merchant_name,
        merchant_category,
        status: "approved".to_string(),
        transaction_date: now,
    };
    card_transactions::create(&mut *tx, &transaction).await?;
    Ok(transaction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fincore_db::Gateway;

    async fn gateway() -> Gateway {
        let gateway = Gateway::connect("sqlite::memory:", 1).await.unwrap();
        gateway.apply_schema().await.unwrap();
        gateway
    }

    fn create_input() -> CreateCardInput {
        CreateCardInput {
            card_type: "virtual".to_string(),
            brand: "visa".to_string(),
            card_number: None,
            cvv: "123".to_string(),
            pin: None,
            holder_name: "Alice Doe".to_string(),
            daily_limit_cents: None,
            monthly_limit_cents: None,
        }
    }

    #[tokio::test]
    async fn create_masks_the_number_and_sets_default_limits() {
        let gateway = gateway().await;
        let user_id = Uuid::new_v4();
        let key = [7u8; 32];
        let mut tx = gateway.begin().await.unwrap();
        let details = create(&mut tx, &key, Argon2Params::default(), user_id, create_input(), Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(details.masked_number.starts_with("**** **** **** "));
        assert_eq!(details.daily_limit_cents, DEFAULT_DAILY_LIMIT_CENTS);
        assert!(!details.has_pin);
    }

    #[tokio::test]
    async fn unowned_card_is_rejected() {
        let gateway = gateway().await;
        let owner = Uuid::new_v4();
        let key = [7u8; 32];
        let mut tx = gateway.begin().await.unwrap();
        let details = create(&mut tx, &key, Argon2Params::default(), owner, create_input(), Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let stranger = Uuid::new_v4();
        let mut tx = gateway.begin().await.unwrap();
        let result = get_details(&mut tx, stranger, details.id, Utc::now()).await;
        assert!(matches!(result, Err(CardVaultError::Unauthorized)));
    }

    #[tokio::test]
    async fn process_transaction_rejects_amounts_over_the_daily_limit() {
        let gateway = gateway().await;
        let owner = Uuid::new_v4();
        let key = [7u8; 32];
        let mut tx = gateway.begin().await.unwrap();
        let mut input = create_input();
        input.daily_limit_cents = Some(1_000);
        let details = create(&mut tx, &key, Argon2Params::default(), owner, input, Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = gateway.begin().await.unwrap();
        let result = process_transaction(
            &mut tx,
            gateway.backend(),
            details.id,
            1_500,
            "Some Shop".to_string(),
            "retail".to_string(),
            Utc::now(),
        )
        .await;
        assert!(matches!(result, Err(CardVaultError::DailyLimitExceeded)));
    }
}
