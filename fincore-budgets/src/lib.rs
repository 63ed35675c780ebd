//! Budget accountant (spec.md §4.8): advisory counters that never block
//! a transaction. After any committed outflow, every budget whose
//! `(category, period)` envelope contains the outflow's `completed_at`
//! is updated in the same transaction.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use fincore_db::pool::Backend;
use fincore_db::queries::budgets;
use fincore_db::types::{Budget, BudgetPeriod};

#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    #[error("budget not found")]
    BudgetNotFound,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl From<BudgetError> for fincore_error::Error {
    fn from(e: BudgetError) -> Self {
        match e {
            BudgetError::BudgetNotFound => fincore_error::Error::not_found(),
            BudgetError::Db(e) => fincore_db::map_db_error(e),
        }
    }
}

/// A budget whose spend ratio crossed `alert_threshold_pct` upward as a
/// result of the outflow just applied. Delivery is an external
/// collaborator (spec.md §4.8) — this crate only raises the flag.
#[derive(Debug, Clone)]
pub struct BudgetAlert {
    pub budget_id: Uuid,
    pub category: String,
    pub period: BudgetPeriod,
    pub current_spent_cents: i64,
    pub limit_cents: i64,
}

fn ratio_pct(spent_cents: i64, limit_cents: i64) -> i64 {
    if limit_cents <= 0 {
        return 0;
    }
    spent_cents.saturating_mul(100) / limit_cents
}

/// Updates every budget in `category` whose window contains
/// `completed_at`'s date, and returns the ones that just crossed their
/// alert threshold. Must run inside the same transaction as the outflow
/// it accounts for.
pub async fn apply_outflow(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    backend: Backend,
    user_id: Uuid,
    category: &str,
    amount_cents: i64,
    completed_at: DateTime<Utc>,
) -> Result<Vec<BudgetAlert>, BudgetError> {
    let candidates = budgets::list_for_user(&mut *tx, user_id).await?;
    let completed_date = completed_at.date_naive();

    let mut alerts = Vec::new();
    for candidate in candidates {
        if candidate.category != category {
            continue;
        }
        if completed_date < candidate.start_date || completed_date > candidate.end_date {
            continue;
        }

        let locked = budgets::get_for_update(&mut *tx, backend, candidate.id)
            .await?
            .ok_or(BudgetError::BudgetNotFound)?;
        let before_pct = ratio_pct(locked.current_spent_cents, locked.limit_cents);
        let new_spent = locked.current_spent_cents + amount_cents;
        let after_pct = ratio_pct(new_spent, locked.limit_cents);

        budgets::add_spend(&mut *tx, locked.id, amount_cents).await?;

        if locked.alerts_enabled && before_pct < locked.alert_threshold_pct as i64 && after_pct >= locked.alert_threshold_pct as i64 {
            alerts.push(BudgetAlert {
                budget_id: locked.id,
                category: locked.category,
                period: locked.period,
                current_spent_cents: new_spent,
                limit_cents: locked.limit_cents,
            });
        }
    }
    Ok(alerts)
}

pub async fn create(tx: &mut sqlx::Transaction<'_, sqlx::Any>, budget: &Budget) -> Result<(), BudgetError> {
    budgets::create(&mut *tx, budget).await?;
    Ok(())
}

pub async fn list(tx: &mut sqlx::Transaction<'_, sqlx::Any>, user_id: Uuid) -> Result<Vec<Budget>, BudgetError> {
    Ok(budgets::list_for_user(&mut *tx, user_id).await?)
}

pub async fn set_alerts_enabled(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    budget_id: Uuid,
    enabled: bool,
) -> Result<(), BudgetError> {
    budgets::set_alerts_enabled(&mut *tx, budget_id, enabled).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fincore_db::types::BudgetPeriod;
    use fincore_db::Gateway;

    fn sample_budget(user_id: Uuid) -> Budget {
        let today = Utc::now().date_naive();
        Budget {
            id: Uuid::new_v4(),
            user_id,
            category: "groceries".to_string(),
            period: BudgetPeriod::Monthly,
            limit_cents: 10_000,
            current_spent_cents: 0,
            alert_threshold_pct: 80,
            alerts_enabled: true,
            start_date: today - chrono::Duration::days(5),
            end_date: today + chrono::Duration::days(25),
        }
    }

    #[tokio::test]
    async fn outflow_inside_the_window_increments_the_counter() {
        let gateway = Gateway::connect("sqlite::memory:", 1).await.unwrap();
        gateway.apply_schema().await.unwrap();
        let user_id = Uuid::new_v4();
        let budget = sample_budget(user_id);

        let mut tx = gateway.begin().await.unwrap();
        create(&mut tx, &budget).await.unwrap();
        let alerts = apply_outflow(&mut tx, gateway.backend(), user_id, "groceries", 5_000, Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(alerts.is_empty());
        let reloaded = list(&mut gateway.begin().await.unwrap(), user_id).await.unwrap();
        assert_eq!(reloaded[0].current_spent_cents, 5_000);
    }

    #[tokio::test]
    async fn crossing_the_threshold_raises_exactly_one_alert() {
        let gateway = Gateway::connect("sqlite::memory:", 1).await.unwrap();
        gateway.apply_schema().await.unwrap();
        let user_id = Uuid::new_v4();
        let budget = sample_budget(user_id);

        let mut tx = gateway.begin().await.unwrap();
        create(&mut tx, &budget).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = gateway.begin().await.unwrap();
        let alerts = apply_outflow(&mut tx, gateway.backend(), user_id, "groceries", 8_500, Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].budget_id, budget.id);

        let mut tx = gateway.begin().await.unwrap();
        let alerts_again = apply_outflow(&mut tx, gateway.backend(), user_id, "groceries", 500, Utc::now())
            .await
            .unwrap();
        assert!(alerts_again.is_empty());
    }

    #[tokio::test]
    async fn a_different_category_is_left_untouched() {
        let gateway = Gateway::connect("sqlite::memory:", 1).await.unwrap();
        gateway.apply_schema().await.unwrap();
        let user_id = Uuid::new_v4();
        let budget = sample_budget(user_id);

        let mut tx = gateway.begin().await.unwrap();
        create(&mut tx, &budget).await.unwrap();
        let alerts = apply_outflow(&mut tx, gateway.backend(), user_id, "entertainment", 9_000, Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(alerts.is_empty());
        let reloaded = list(&mut gateway.begin().await.unwrap(), user_id).await.unwrap();
        assert_eq!(reloaded[0].current_spent_cents, 0);
    }
}
