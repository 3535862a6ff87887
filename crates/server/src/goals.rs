//! Goals API endpoints.

use api_types::goal::{
    GoalContributionsResponse, GoalListResponse, GoalNew, GoalUpdate, GoalView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};
use engine::{users, MoneyCents, NewGoalCmd, UpdateGoalCmd};

fn map_goal(goal: engine::Goal) -> GoalView {
    GoalView {
        id: goal.id,
        name: goal.name,
        target_amount_minor: goal.target_amount.cents(),
        current_amount_minor: goal.current_amount.cents(),
        target_date: goal.target_date,
        category: goal.category,
    }
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<GoalNew>,
) -> Result<(StatusCode, Json<GoalView>), ServerError> {
    let goal = state
        .engine
        .new_goal(NewGoalCmd {
            user_id: user.username,
            name: payload.name,
            target_amount: MoneyCents::new(payload.target_amount_minor),
            target_date: payload.target_date,
            category: payload.category,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(map_goal(goal))))
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<GoalListResponse>, ServerError> {
    let goals = state
        .engine
        .goals(&user.username)
        .await?
        .into_iter()
        .map(map_goal)
        .collect();
    Ok(Json(GoalListResponse { goals }))
}

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GoalView>, ServerError> {
    let goal = state.engine.goal(id, &user.username).await?;
    Ok(Json(map_goal(goal)))
}

pub async fn contributions(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GoalContributionsResponse>, ServerError> {
    let transaction_ids = state.engine.goal_contributions(id, &user.username).await?;
    Ok(Json(GoalContributionsResponse { transaction_ids }))
}

pub async fn update(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GoalUpdate>,
) -> Result<Json<GoalView>, ServerError> {
    let cmd = UpdateGoalCmd {
        name: payload.name,
        target_amount: payload.target_amount_minor.map(MoneyCents::new),
        target_date: payload.target_date,
        category: payload
            .category
            .map(|c| if c.is_empty() { None } else { Some(c) }),
    };

    let goal = state.engine.update_goal(id, &user.username, cmd).await?;
    Ok(Json(map_goal(goal)))
}

pub async fn remove(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_goal(id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}
