//! Categories API endpoints.

use api_types::category::{CategoryListResponse, CategoryNew, CategoryView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};
use engine::users;

fn map_category(model: engine::categories::Model) -> Result<CategoryView, ServerError> {
    let id = Uuid::parse_str(&model.id)
        .map_err(|_| ServerError::Generic("malformed category id".to_string()))?;
    Ok(CategoryView {
        id,
        name: model.name,
    })
}

pub async fn create(
    _: Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<CategoryNew>,
) -> Result<(StatusCode, Json<CategoryView>), ServerError> {
    let category = state.engine.new_category(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(map_category(category)?)))
}

pub async fn list(
    _: Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<CategoryListResponse>, ServerError> {
    let categories = state
        .engine
        .categories()
        .await?
        .into_iter()
        .map(map_category)
        .collect::<Result<_, _>>()?;
    Ok(Json(CategoryListResponse { categories }))
}

pub async fn remove(
    _: Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
