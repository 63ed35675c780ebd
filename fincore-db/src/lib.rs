//! Persistence gateway: connection pool, row types and hand-rolled
//! query functions, grounded on `util/rich-indexer`'s sqlx usage.
//!
//! Every table in spec.md §3 gets its own module under [`queries`].
//! Callers that need a row lock for the lifetime of a mutation
//! (spec.md §4.2) open a transaction through [`Gateway::begin`] and
//! pass `&mut *tx` into the `*_for_update` query functions; read-only
//! callers pass [`Gateway::pool`] directly.

pub mod pool;
pub mod queries;
pub mod types;

pub use pool::{map_db_error, Backend, Gateway};
