//! Favorite and shopping-cart toggles.
//!
//! Both relations share one code path; the storage layer's unique
//! constraint decides whether a request created or removed anything.

use super::types::RecipeShortResponse;
use crate::config::Config;
use crate::database::{Presence, RecipeRelation, Removal, SqlStorage, SqlStorageError};
use crate::error::{ApiError, ApiResult};
use crate::media::FileStorage;
use crate::state::AppState;
use crate::users::session_auth::RequireAuth;
use crate::users::storage::UserStorage;
use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};

fn recipe_not_found() -> ApiError {
    ApiError::not_found("Recipe not found.")
}

async fn add<S: SqlStorage>(
    storage: &S,
    config: &Config,
    relation: RecipeRelation,
    user_id: i64,
    recipe_id: i64,
) -> ApiResult<(StatusCode, Json<RecipeShortResponse>)> {
    let recipe = storage
        .recipes_get(recipe_id)
        .await?
        .ok_or_else(recipe_not_found)?;

    match storage.recipe_relation_add(relation, user_id, recipe_id).await {
        Ok(Presence::Created) => {
            tracing::info!(relation = relation.table(), "relation added");
            Ok((
                StatusCode::CREATED,
                Json(RecipeShortResponse::new(recipe, config)),
            ))
        }
        Ok(Presence::AlreadyPresent) => {
            tracing::warn!(relation = relation.table(), "relation already present");
            Err(ApiError::bad_request(format!(
                "Recipe is already in {}.",
                relation.label()
            )))
        }
        // Recipe deleted between the lookup and the insert
        Err(SqlStorageError::ForeignKey(_)) => Err(recipe_not_found()),
        Err(e) => Err(e.into()),
    }
}

async fn remove<S: SqlStorage>(
    storage: &S,
    relation: RecipeRelation,
    user_id: i64,
    recipe_id: i64,
) -> ApiResult<StatusCode> {
    if storage.recipes_get(recipe_id).await?.is_none() {
        return Err(recipe_not_found());
    }

    match storage
        .recipe_relation_remove(relation, user_id, recipe_id)
        .await?
    {
        Removal::Deleted => {
            tracing::info!(relation = relation.table(), "relation removed");
            Ok(StatusCode::NO_CONTENT)
        }
        Removal::AlreadyAbsent => {
            tracing::warn!(relation = relation.table(), "relation already absent");
            Err(ApiError::bad_request(format!(
                "Recipe is not in {}.",
                relation.label()
            )))
        }
    }
}

#[tracing::instrument(skip_all, fields(recipe_id = id, user_id = auth.user_id()))]
pub async fn add_favorite<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Extension(config): Extension<Config>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> ApiResult<(StatusCode, Json<RecipeShortResponse>)>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    add(&state.sql_storage, &config, RecipeRelation::Favorite, auth.user_id(), id).await
}

#[tracing::instrument(skip_all, fields(recipe_id = id, user_id = auth.user_id()))]
pub async fn remove_favorite<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    remove(&state.sql_storage, RecipeRelation::Favorite, auth.user_id(), id).await
}

#[tracing::instrument(skip_all, fields(recipe_id = id, user_id = auth.user_id()))]
pub async fn add_to_cart<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Extension(config): Extension<Config>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> ApiResult<(StatusCode, Json<RecipeShortResponse>)>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    add(
        &state.sql_storage,
        &config,
        RecipeRelation::ShoppingCart,
        auth.user_id(),
        id,
    )
    .await
}

#[tracing::instrument(skip_all, fields(recipe_id = id, user_id = auth.user_id()))]
pub async fn remove_from_cart<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    remove(
        &state.sql_storage,
        RecipeRelation::ShoppingCart,
        auth.user_id(),
        id,
    )
    .await
}
