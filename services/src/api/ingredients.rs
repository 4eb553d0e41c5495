use super::types::IngredientResponse;
use crate::database::SqlStorage;
use crate::error::{ApiError, ApiResult};
use crate::media::FileStorage;
use crate::state::AppState;
use crate::users::storage::UserStorage;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct IngredientSearch {
    /// Case-insensitive name prefix.
    pub name: Option<String>,
}

#[tracing::instrument(skip_all, fields(prefix = ?query.name))]
pub async fn list_ingredients<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Query(query): Query<IngredientSearch>,
) -> ApiResult<Json<Vec<IngredientResponse>>>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let rows = state
        .sql_storage
        .ingredients_search(query.name.as_deref().map(str::trim))
        .await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[tracing::instrument(skip_all, fields(ingredient_id = id))]
pub async fn get_ingredient<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<IngredientResponse>>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    state
        .sql_storage
        .ingredients_get(id)
        .await?
        .map(|ingredient| Json(ingredient.into()))
        .ok_or_else(|| ApiError::not_found("Ingredient not found."))
}
