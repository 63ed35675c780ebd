use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use fincore_transfers::{PixInput, TedInput};
use fincore_validators::PixKeyKind;

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::identity::Identity;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pix", post(pix))
        .route("/ted", post(ted))
        .route("/p2p", post(p2p))
        .route("/p2p/request", post(p2p_request))
        .route("/deposit", post(deposit))
        .route("/{id}/cancel", post(cancel))
        .route("/{id}/approve", post(p2p_approve))
        .route("/{id}/reject", post(p2p_reject))
        .route("/", get(list))
}

fn pix_key_kind(s: &str) -> Result<PixKeyKind, ApiError> {
    match s {
        "cpf" => Ok(PixKeyKind::Cpf),
        "cnpj" => Ok(PixKeyKind::Cnpj),
        "email" => Ok(PixKeyKind::Email),
        "phone" => Ok(PixKeyKind::Phone),
        "random" => Ok(PixKeyKind::Random),
        _ => Err(fincore_validators::ValidationError::InvalidPixKey.into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct PixRequest {
    pub pix_key: String,
    pub pix_key_type: String,
    pub amount_cents: i64,
    pub description: Option<String>,
}

async fn pix(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<PixRequest>,
) -> Result<Json<Envelope<fincore_db::types::Transfer>>, ApiError> {
    let ctx = identity.request_context();
    let input = PixInput {
        pix_key: body.pix_key,
        pix_key_type: pix_key_kind(&body.pix_key_type)?,
        amount_cents: body.amount_cents,
        description: body.description,
    };
    let transfer = state.coordinator.pix(&ctx, input).await?;
    Ok(Json(Envelope::new(transfer)))
}

#[derive(Debug, Deserialize)]
pub struct TedRequest {
    pub recipient_name: String,
    pub recipient_document: String,
    pub recipient_bank: String,
    pub recipient_branch: String,
    pub recipient_account: String,
    pub recipient_account_type: String,
    pub amount_cents: i64,
}

async fn ted(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<TedRequest>,
) -> Result<Json<Envelope<fincore_db::types::Transfer>>, ApiError> {
    let ctx = identity.request_context();
    let input = TedInput {
        recipient_name: body.recipient_name,
        recipient_document: body.recipient_document,
        recipient_bank: body.recipient_bank,
        recipient_branch: body.recipient_branch,
        recipient_account: body.recipient_account,
        recipient_account_type: body.recipient_account_type,
        amount_cents: body.amount_cents,
    };
    let transfer = state.coordinator.ted(&ctx, input).await?;
    Ok(Json(Envelope::new(transfer)))
}

#[derive(Debug, Deserialize)]
pub struct P2pRequest {
    pub recipient_user_id: Uuid,
    pub amount_cents: i64,
    pub description: Option<String>,
}

async fn p2p(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<P2pRequest>,
) -> Result<Json<Envelope<fincore_db::types::Transfer>>, ApiError> {
    let ctx = identity.request_context();
    let transfer = state
        .coordinator
        .p2p_immediate(&ctx, body.recipient_user_id, body.amount_cents, body.description)
        .await?;
    Ok(Json(Envelope::new(transfer)))
}

#[derive(Debug, Deserialize)]
pub struct P2pRequestRequest {
    pub payer_id: Uuid,
    pub amount_cents: i64,
    pub description: Option<String>,
}

async fn p2p_request(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<P2pRequestRequest>,
) -> Result<Json<Envelope<fincore_db::types::Transfer>>, ApiError> {
    let ctx = identity.request_context();
    let transfer = state
        .coordinator
        .p2p_request(&ctx, body.payer_id, body.amount_cents, body.description)
        .await?;
    Ok(Json(Envelope::new(transfer)))
}

async fn p2p_approve(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<fincore_db::types::Transfer>>, ApiError> {
    let ctx = identity.request_context();
    let transfer = state.coordinator.p2p_approve(&ctx, id).await?;
    Ok(Json(Envelope::new(transfer)))
}

async fn p2p_reject(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<fincore_db::types::Transfer>>, ApiError> {
    let ctx = identity.request_context();
    let transfer = state.coordinator.p2p_reject(&ctx, id).await?;
    Ok(Json(Envelope::new(transfer)))
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount_cents: i64,
}

async fn deposit(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<DepositRequest>,
) -> Result<Json<Envelope<fincore_db::types::Transfer>>, ApiError> {
    let ctx = identity.request_context();
    let transfer = state.coordinator.deposit(&ctx, body.amount_cents).await?;
    Ok(Json(Envelope::new(transfer)))
}

async fn cancel(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<fincore_db::types::Transfer>>, ApiError> {
    let ctx = identity.request_context();
    let transfer = state.coordinator.cancel_transfer(&ctx, id).await?;
    Ok(Json(Envelope::new(transfer)))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

async fn list(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ListQuery>,
) -> Result<Json<crate::envelope::PaginatedEnvelope<fincore_db::types::Transfer>>, ApiError> {
    let ctx = identity.request_context();
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let transfers = state.coordinator.list_transfers(&ctx, limit as i64).await?;
    let total = transfers.len() as u64;
    Ok(Json(crate::envelope::PaginatedEnvelope {
        data: transfers,
        pagination: crate::envelope::Pagination::new(query.page.unwrap_or(1), limit, total),
    }))
}
