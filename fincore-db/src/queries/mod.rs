//! Hand-rolled row mapping and query functions.
//!
//! Every function is generic over `E: sqlx::Executor<'e, Database =
//! sqlx::Any>` so the same code runs against a bare `&AnyPool` (auto
//! committed) or a `&mut Transaction<'_, Any>` (spec.md §4.2's
//! lock-then-mutate flows), matching the executor-generic style
//! `util/rich-indexer` uses for its own query helpers.

pub mod audit;
pub mod bills;
pub mod budgets;
pub mod card_transactions;
pub mod cards;
pub mod transfers;
pub mod users;

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;
use uuid::Uuid;

fn decode_err(column: &'static str, source: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

pub(crate) fn get_uuid(row: &sqlx::any::AnyRow, column: &'static str) -> Result<Uuid, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    Uuid::from_str(&raw).map_err(|e| decode_err(column, e))
}

pub(crate) fn get_uuid_opt(row: &sqlx::any::AnyRow, column: &'static str) -> Result<Option<Uuid>, sqlx::Error> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| Uuid::from_str(&s).map_err(|e| decode_err(column, e))).transpose()
}

pub(crate) fn get_timestamp(row: &sqlx::any::AnyRow, column: &'static str) -> Result<DateTime<Utc>, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| decode_err(column, e))
}

pub(crate) fn get_timestamp_opt(row: &sqlx::any::AnyRow, column: &'static str) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| decode_err(column, e))
    })
    .transpose()
}

pub(crate) fn get_date(row: &sqlx::any::AnyRow, column: &'static str) -> Result<NaiveDate, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| decode_err(column, e))
}

pub(crate) fn get_enum<T>(row: &sqlx::any::AnyRow, column: &'static str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>()
        .map_err(|e| decode_err(column, std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())))
}

pub(crate) fn get_enum_opt<T>(row: &sqlx::any::AnyRow, column: &'static str) -> Result<Option<T>, sqlx::Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| {
        s.parse::<T>()
            .map_err(|e| decode_err(column, std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())))
    })
    .transpose()
}

pub(crate) fn get_json(row: &sqlx::any::AnyRow, column: &'static str) -> Result<serde_json::Value, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw).map_err(|e| decode_err(column, e))
}

pub(crate) fn now_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}
