use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use fincore_cardvault::{CardDetails, CreateCardInput, SecuritySettings};

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::identity::Identity;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/{id}", get(get_one).delete(cancel))
        .route("/{id}/limits", patch(update_limits))
        .route("/{id}/security", patch(update_security))
        .route("/{id}/pin", post(set_pin))
        .route("/{id}/block", post(block))
        .route("/{id}/unblock", post(unblock))
}

#[derive(Debug, Deserialize)]
pub struct CreateCardRequest {
    #[serde(rename = "type")]
    pub card_type: String,
    pub brand: String,
    pub card_number: Option<String>,
    pub cvv: String,
    pub pin: Option<String>,
    pub holder_name: String,
    pub daily_limit_cents: Option<i64>,
    pub monthly_limit_cents: Option<i64>,
}

async fn create(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<CreateCardRequest>,
) -> Result<Json<Envelope<CardDetails>>, ApiError> {
    let ctx = identity.request_context();
    let input = CreateCardInput {
        card_type: body.card_type,
        brand: body.brand,
        card_number: body.card_number,
        cvv: body.cvv,
        pin: body.pin,
        holder_name: body.holder_name,
        daily_limit_cents: body.daily_limit_cents,
        monthly_limit_cents: body.monthly_limit_cents,
    };
    let card = state
        .coordinator
        .create_card(&ctx, &state.config.aes_key, state.config.argon2, input)
        .await?;
    Ok(Json(Envelope::new(card)))
}

async fn list(State(state): State<AppState>, identity: Identity) -> Result<Json<Envelope<Vec<CardDetails>>>, ApiError> {
    let ctx = identity.request_context();
    let cards = state.coordinator.list_cards(&ctx).await?;
    Ok(Json(Envelope::new(cards)))
}

async fn get_one(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<CardDetails>>, ApiError> {
    let ctx = identity.request_context();
    let card = state.coordinator.get_card(&ctx, id).await?;
    Ok(Json(Envelope::new(card)))
}

async fn cancel(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<CardDetails>>, ApiError> {
    let ctx = identity.request_context();
    let card = state.coordinator.cancel_card(&ctx, id).await?;
    Ok(Json(Envelope::new(card)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateLimitsRequest {
    pub daily_limit_cents: i64,
    pub monthly_limit_cents: i64,
}

async fn update_limits(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateLimitsRequest>,
) -> Result<Json<Envelope<CardDetails>>, ApiError> {
    let ctx = identity.request_context();
    let card = state
        .coordinator
        .update_card_limits(&ctx, id, body.daily_limit_cents, body.monthly_limit_cents)
        .await?;
    Ok(Json(Envelope::new(card)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSecurityRequest {
    pub is_contactless: bool,
    pub is_international: bool,
    pub block_international: bool,
    pub block_online: bool,
}

async fn update_security(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateSecurityRequest>,
) -> Result<Json<Envelope<CardDetails>>, ApiError> {
    let ctx = identity.request_context();
    let settings = SecuritySettings {
        is_contactless: body.is_contactless,
        is_international: body.is_international,
        block_international: body.block_international,
        block_online: body.block_online,
    };
    let card = state.coordinator.update_card_security(&ctx, id, settings).await?;
    Ok(Json(Envelope::new(card)))
}

#[derive(Debug, Deserialize)]
pub struct SetPinRequest {
    pub pin: String,
    pub current_pin: Option<String>,
}

async fn set_pin(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(body): Json<SetPinRequest>,
) -> Result<Json<Envelope<()>>, ApiError> {
    let ctx = identity.request_context();
    state
        .coordinator
        .set_card_pin(&ctx, state.config.argon2, id, &body.pin, body.current_pin.as_deref())
        .await?;
    Ok(Json(Envelope::new(())))
}

async fn block(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<CardDetails>>, ApiError> {
    let ctx = identity.request_context();
    let card = state.coordinator.block_card(&ctx, id).await?;
    Ok(Json(Envelope::new(card)))
}

async fn unblock(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<CardDetails>>, ApiError> {
    let ctx = identity.request_context();
    let card = state.coordinator.unblock_card(&ctx, id).await?;
    Ok(Json(Envelope::new(card)))
}
