//! Response envelopes (spec.md §6): every success is `{data, meta}` or
//! `{data, pagination}`; every failure is `{error, meta}`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct Meta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

impl Meta {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
    pub meta: Meta,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self { data, meta: Meta::new() }
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let limit_u64 = limit.max(1) as u64;
        let total_pages = total.div_ceil(limit_u64).max(1);
        Self {
            page,
            limit,
            total,
            total_pages,
            has_more: (page as u64) < total_pages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedEnvelope<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
    pub meta: Meta,
}
