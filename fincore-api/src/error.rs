//! The single place a propagated error becomes an HTTP response
//! (spec.md §7 "the coordinator is the single place that maps to the
//! HTTP status" — one layer up, at the edge that actually speaks
//! HTTP). `detail` never leaves the process: it goes to the server log
//! only, since it may carry a raw `sqlx`/crypto error message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::envelope::{ErrorBody, ErrorEnvelope, Meta};

#[derive(Debug)]
pub struct ApiError(pub fincore_error::Error);

impl From<fincore_error::Error> for ApiError {
    fn from(e: fincore_error::Error) -> Self {
        Self(e)
    }
}

impl From<fincore_cardvault::CardVaultError> for ApiError {
    fn from(e: fincore_cardvault::CardVaultError) -> Self {
        Self(e.into())
    }
}

impl From<fincore_bills::BillError> for ApiError {
    fn from(e: fincore_bills::BillError) -> Self {
        Self(e.into())
    }
}

impl From<fincore_budgets::BudgetError> for ApiError {
    fn from(e: fincore_budgets::BudgetError) -> Self {
        Self(e.into())
    }
}

impl From<fincore_validators::ValidationError> for ApiError {
    fn from(e: fincore_validators::ValidationError) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = self.0;
        if let Some(detail) = &error.detail {
            log::warn!(target: "fincore_api", "{} {}: {detail}", error.code, error.message);
        }
        let status = StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorEnvelope {
            error: ErrorBody {
                code: error.code,
                message: error.message,
                details: None,
            },
            meta: Meta::new(),
        };
        (status, Json(body)).into_response()
    }
}
