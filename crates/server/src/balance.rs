//! Balance API endpoint.

use api_types::balance::BalanceResponse;
use axum::{Extension, Json, extract::State};

use crate::{ServerError, server::ServerState};
use engine::users;

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<BalanceResponse>, ServerError> {
    let summary = state.engine.balance(&user.username).await?;

    Ok(Json(BalanceResponse {
        balance_minor: summary.balance.cents(),
        total_income_minor: summary.income.cents(),
        total_expenses_minor: summary.expense.cents(),
    }))
}
