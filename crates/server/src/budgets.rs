//! Budgets API endpoints.

use api_types::budget::{
    BudgetListResponse, BudgetNew, BudgetPeriod as ApiPeriod, BudgetUpdate, BudgetView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};
use engine::{users, MoneyCents, NewBudgetCmd, UpdateBudgetCmd};

fn map_period(period: engine::BudgetPeriod) -> ApiPeriod {
    match period {
        engine::BudgetPeriod::Weekly => ApiPeriod::Weekly,
        engine::BudgetPeriod::Monthly => ApiPeriod::Monthly,
    }
}

fn map_period_in(period: ApiPeriod) -> engine::BudgetPeriod {
    match period {
        ApiPeriod::Weekly => engine::BudgetPeriod::Weekly,
        ApiPeriod::Monthly => engine::BudgetPeriod::Monthly,
    }
}

fn map_budget(budget: engine::Budget) -> BudgetView {
    BudgetView {
        id: budget.id,
        amount_minor: budget.amount.cents(),
        current_amount_minor: budget.current_amount.cents(),
        utilization: budget.utilization(),
        period: map_period(budget.period),
        category: budget.category,
        tags: budget.tags,
        start_date: budget.start_date,
        end_date: budget.end_date,
    }
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<BudgetNew>,
) -> Result<(StatusCode, Json<BudgetView>), ServerError> {
    let budget = state
        .engine
        .new_budget(NewBudgetCmd {
            user_id: user.username,
            amount: MoneyCents::new(payload.amount_minor),
            period: map_period_in(payload.period),
            category: payload.category,
            tags: payload.tags,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(map_budget(budget))))
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<BudgetListResponse>, ServerError> {
    let budgets = state
        .engine
        .budgets(&user.username)
        .await?
        .into_iter()
        .map(map_budget)
        .collect();
    Ok(Json(BudgetListResponse { budgets }))
}

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BudgetView>, ServerError> {
    let budget = state.engine.budget(id, &user.username).await?;
    Ok(Json(map_budget(budget)))
}

pub async fn update(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BudgetUpdate>,
) -> Result<Json<BudgetView>, ServerError> {
    let cmd = UpdateBudgetCmd {
        amount: payload.amount_minor.map(MoneyCents::new),
        category: payload
            .category
            .map(|c| if c.is_empty() { None } else { Some(c) }),
        tags: payload.tags,
    };

    let budget = state.engine.update_budget(id, &user.username, cmd).await?;
    Ok(Json(map_budget(budget)))
}

pub async fn remove(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_budget(id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}
