use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use fincore_db::types::Bill;
use fincore_validators::validate_barcode;

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::identity::Identity;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/validate", post(validate)).route("/pay", post(pay))
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub barcode: String,
}

#[derive(Debug, serde::Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub amount_cents: i64,
}

async fn validate(Json(body): Json<ValidateRequest>) -> Result<Json<Envelope<ValidateResponse>>, ApiError> {
    let amount_cents = validate_barcode(&body.barcode)?;
    Ok(Json(Envelope::new(ValidateResponse { valid: true, amount_cents })))
}

/// `amount_cents` is accepted for wire compatibility with spec.md §6 but
/// never trusted: the engine always re-derives the amount from the
/// barcode itself (spec.md §4.7), so a caller cannot pay a different
/// amount than the one the barcode encodes.
#[derive(Debug, Deserialize)]
pub struct PayRequest {
    pub barcode: String,
    #[serde(default)]
    pub amount_cents: Option<i64>,
    #[serde(default)]
    pub recipient_name: Option<String>,
    #[serde(default)]
    pub due_date: Option<chrono::NaiveDate>,
}

async fn pay(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<PayRequest>,
) -> Result<Json<Envelope<Bill>>, ApiError> {
    let ctx = identity.request_context();
    let recipient_name = body.recipient_name.unwrap_or_default();
    let due_date = body.due_date.unwrap_or_else(|| ctx.now.date_naive());
    let bill = state.coordinator.pay_bill(&ctx, &body.barcode, recipient_name, due_date).await?;
    Ok(Json(Envelope::new(bill)))
}
