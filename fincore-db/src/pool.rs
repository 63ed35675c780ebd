//! Connection pool and backend-dispatch helpers.
//!
//! Production runs against Postgres; the integration test suite runs
//! the same query code against an in-memory sqlite database via the
//! `Any` driver (grounded on `util/rich-indexer`'s `connect_sqlite`
//! helper). `Backend` is the one place that knows the two diverge —
//! row locking is a Postgres-only clause (spec.md §4.2).

use sqlx::any::{AnyPool, AnyPoolOptions};
use sqlx::Transaction;

pub const POSTGRES_SCHEMA: &str = include_str!("../migrations/postgres/0001_init.sql");
pub const SQLITE_SCHEMA: &str = include_str!("../migrations/sqlite/0001_init.sql");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Sqlite,
}

impl Backend {
    pub fn detect(database_url: &str) -> Self {
        if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
            Backend::Postgres
        } else {
            Backend::Sqlite
        }
    }

    /// `SELECT ... FOR UPDATE` row locking is only meaningful (and only
    /// valid syntax) on Postgres; sqlite serializes writers itself.
    pub fn for_update_suffix(self) -> &'static str {
        match self {
            Backend::Postgres => " FOR UPDATE",
            Backend::Sqlite => "",
        }
    }

    fn schema(self) -> &'static str {
        match self {
            Backend::Postgres => POSTGRES_SCHEMA,
            Backend::Sqlite => SQLITE_SCHEMA,
        }
    }
}

pub struct Gateway {
    pool: AnyPool,
    backend: Backend,
}

impl Gateway {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        sqlx::any::install_default_drivers();
        let backend = Backend::detect(database_url);
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool, backend })
    }

    /// Applies the schema for whichever backend this gateway connected
    /// to. Idempotent (every statement is `IF NOT EXISTS`), so it is
    /// safe to call on every process start.
    pub async fn apply_schema(&self) -> Result<(), sqlx::Error> {
        for statement in split_statements(self.backend.schema()) {
            sqlx::raw_sql(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub async fn begin(&self) -> Result<Transaction<'static, sqlx::Any>, sqlx::Error> {
        self.pool.begin().await
    }
}

/// Postgres SQLSTATEs that mean "somebody else held the row/statement
/// too long, retrying is safe" rather than a real failure: lock
/// acquisition timeout, statement timeout, serialization failure and
/// deadlock (spec.md §4.6 calls all four out as retryable contention).
const CONTENTION_SQLSTATES: &[&str] = &["55P03", "57014", "40001", "40P01"];

/// Maps a raw `sqlx::Error` to the fincore error taxonomy. A contention
/// SQLSTATE becomes [`fincore_error::Error::contention`]; everything
/// else becomes `internal()` with the raw error text attached for logs.
/// This is the one place that inspects a database error code — callers
/// above this crate only ever see the already-typed [`fincore_error::Error`].
pub fn map_db_error(e: sqlx::Error) -> fincore_error::Error {
    if let sqlx::Error::Database(ref db_err) = e {
        if let Some(code) = db_err.code() {
            if CONTENTION_SQLSTATES.contains(&code.as_ref()) {
                return fincore_error::Error::contention();
            }
        }
    }
    fincore_error::Error::internal().with_detail(e.to_string())
}

/// `raw_sql` accepts a single statement on some backends when comments
/// precede it; splitting on `;` keeps each `CREATE TABLE`/`CREATE
/// INDEX`/`CREATE RULE` independently idempotent-checkable.
fn split_statements(schema: &str) -> impl Iterator<Item = &str> {
    schema.split(';').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_postgres_by_scheme() {
        assert_eq!(Backend::detect("postgres://u:p@host/db"), Backend::Postgres);
        assert_eq!(Backend::detect("postgresql://u:p@host/db"), Backend::Postgres);
    }

    #[test]
    fn detects_sqlite_by_default() {
        assert_eq!(Backend::detect("sqlite::memory:"), Backend::Sqlite);
        assert_eq!(Backend::detect("sqlite://test.db"), Backend::Sqlite);
    }

    #[test]
    fn only_postgres_gets_the_row_lock_clause() {
        assert_eq!(Backend::Postgres.for_update_suffix(), " FOR UPDATE");
        assert_eq!(Backend::Sqlite.for_update_suffix(), "");
    }

    #[test]
    fn splits_schema_into_nonempty_statements() {
        let statements: Vec<_> = split_statements("CREATE TABLE a (x INT);\n\nCREATE TABLE b (y INT);").collect();
        assert_eq!(statements.len(), 2);
    }
}
