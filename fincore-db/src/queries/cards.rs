use sqlx::Row;
use uuid::Uuid;

use super::{get_enum, get_timestamp, get_timestamp_opt, get_uuid};
use crate::pool::Backend;
use crate::types::{Card, CardBrand, CardStatus, CardType};

const COLUMNS: &str = "id, user_id, card_type, brand, status, card_number_ct, cvv_ct, pin_hash, last_four, \
     holder_name, expiry_month, expiry_year, daily_limit_cents, monthly_limit_cents, \
     is_contactless, is_international, block_international, block_online, created_at, expires_at, blocked_at";

fn from_row(row: &sqlx::any::AnyRow) -> Result<Card, sqlx::Error> {
    Ok(Card {
        id: get_uuid(row, "id")?,
        user_id: get_uuid(row, "user_id")?,
        card_type: get_enum::<CardType>(row, "card_type")?,
        brand: get_enum::<CardBrand>(row, "brand")?,
        status: get_enum::<CardStatus>(row, "status")?,
        card_number_ct: row.try_get("card_number_ct")?,
        cvv_ct: row.try_get("cvv_ct")?,
        pin_hash: row.try_get("pin_hash")?,
        last_four: row.try_get("last_four")?,
        holder_name: row.try_get("holder_name")?,
        expiry_month: row.try_get("expiry_month")?,
        expiry_year: row.try_get("expiry_year")?,
        daily_limit_cents: row.try_get("daily_limit_cents")?,
        monthly_limit_cents: row.try_get("monthly_limit_cents")?,
        is_contactless: row.try_get("is_contactless")?,
        is_international: row.try_get("is_international")?,
        block_international: row.try_get("block_international")?,
        block_online: row.try_get("block_online")?,
        created_at: get_timestamp(row, "created_at")?,
        expires_at: get_timestamp(row, "expires_at")?,
        blocked_at: get_timestamp_opt(row, "blocked_at")?,
    })
}

pub async fn get<'e, E>(exec: E, id: Uuid) -> Result<Option<Card>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!("SELECT {COLUMNS} FROM cards WHERE id = ?");
    let row = sqlx::query(&sql).bind(id.to_string()).fetch_optional(exec).await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn get_for_update<'e, E>(exec: E, backend: Backend, id: Uuid) -> Result<Option<Card>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!("SELECT {COLUMNS} FROM cards WHERE id = ?{}", backend.for_update_suffix());
    let row = sqlx::query(&sql).bind(id.to_string()).fetch_optional(exec).await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn list_for_user<'e, E>(exec: E, user_id: Uuid) -> Result<Vec<Card>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!("SELECT {COLUMNS} FROM cards WHERE user_id = ? ORDER BY created_at DESC");
    let rows = sqlx::query(&sql).bind(user_id.to_string()).fetch_all(exec).await?;
    rows.iter().map(from_row).collect()
}

#[allow(clippy::too_many_arguments)]
pub async fn create<'e, E>(exec: E, c: &Card) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    let sql = format!(
        "INSERT INTO cards ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    );
    sqlx::query(&sql)
        .bind(c.id.to_string())
        .bind(c.user_id.to_string())
        .bind(c.card_type.as_str())
        .bind(c.brand.as_str())
        .bind(c.status.as_str())
        .bind(c.card_number_ct.clone())
        .bind(c.cvv_ct.clone())
        .bind(c.pin_hash.clone())
        .bind(c.last_four.clone())
        .bind(c.holder_name.clone())
        .bind(c.expiry_month)
        .bind(c.expiry_year)
        .bind(c.daily_limit_cents)
        .bind(c.monthly_limit_cents)
        .bind(c.is_contactless)
        .bind(c.is_international)
        .bind(c.block_international)
        .bind(c.block_online)
        .bind(super::now_rfc3339(c.created_at))
        .bind(super::now_rfc3339(c.expires_at))
        .bind(c.blocked_at.map(super::now_rfc3339))
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn set_status<'e, E>(
    exec: E,
    id: Uuid,
    status: CardStatus,
    blocked_at: Option<chrono::DateTime<chrono::Utc>>,
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    sqlx::query("UPDATE cards SET status = ?, blocked_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(blocked_at.map(super::now_rfc3339))
        .bind(id.to_string())
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn set_limits<'e, E>(exec: E, id: Uuid, daily_cents: i64, monthly_cents: i64) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    sqlx::query("UPDATE cards SET daily_limit_cents = ?, monthly_limit_cents = ? WHERE id = ?")
        .bind(daily_cents)
        .bind(monthly_cents)
        .bind(id.to_string())
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn set_security_settings<'e, E>(
    exec: E,
    id: Uuid,
    is_contactless: bool,
    is_international: bool,
    block_international: bool,
    block_online: bool,
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    sqlx::query(
        "UPDATE cards SET is_contactless = ?, is_international = ?, block_international = ?, block_online = ? \
         WHERE id = ?",
    )
    .bind(is_contactless)
    .bind(is_international)
    .bind(block_international)
    .bind(block_online)
    .bind(id.to_string())
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn set_pin_hash<'e, E>(exec: E, id: Uuid, pin_hash: &str) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Any>,
{
    sqlx::query("UPDATE cards SET pin_hash = ? WHERE id = ?")
        .bind(pin_hash)
        .bind(id.to_string())
        .execute(exec)
        .await?;
    Ok(())
}

