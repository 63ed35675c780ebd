use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use fincore_db::types::{Budget, BudgetPeriod};

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::identity::Identity;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create)).route("/summary", get(summary))
}

#[derive(Debug, Deserialize)]
pub struct CreateBudgetRequest {
    pub category: String,
    pub period: String,
    pub limit_cents: i64,
    #[serde(default = "default_alert_threshold_pct")]
    pub alert_threshold_pct: i32,
    #[serde(default = "default_alerts_enabled")]
    pub alerts_enabled: bool,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
}

fn default_alert_threshold_pct() -> i32 {
    80
}

fn default_alerts_enabled() -> bool {
    true
}

fn period_from_str(s: &str) -> Result<BudgetPeriod, ApiError> {
    match s {
        "weekly" => Ok(BudgetPeriod::Weekly),
        "monthly" => Ok(BudgetPeriod::Monthly),
        "annual" => Ok(BudgetPeriod::Annual),
        _ => Err(fincore_validators::ValidationError::InvalidAmount.into()),
    }
}

async fn create(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<CreateBudgetRequest>,
) -> Result<Json<Envelope<Budget>>, ApiError> {
    let ctx = identity.request_context();
    let budget = Budget {
        id: Uuid::new_v4(),
        user_id: identity.user_id,
        category: body.category,
        period: period_from_str(&body.period)?,
        limit_cents: body.limit_cents,
        current_spent_cents: 0,
        alert_threshold_pct: body.alert_threshold_pct,
        alerts_enabled: body.alerts_enabled,
        start_date: body.start_date,
        end_date: body.end_date,
    };
    let created = state.coordinator.create_budget(&ctx, budget).await?;
    Ok(Json(Envelope::new(created)))
}

async fn summary(State(state): State<AppState>, identity: Identity) -> Result<Json<Envelope<Vec<Budget>>>, ApiError> {
    let ctx = identity.request_context();
    let budgets = state.coordinator.list_budgets(&ctx).await?;
    Ok(Json(Envelope::new(budgets)))
}
