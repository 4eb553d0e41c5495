use super::types::TagResponse;
use crate::database::SqlStorage;
use crate::error::{ApiError, ApiResult};
use crate::media::FileStorage;
use crate::state::AppState;
use crate::users::storage::UserStorage;
use axum::{
    Json,
    extract::{Path, State},
};

#[tracing::instrument(skip_all)]
pub async fn list_tags<S, U, F>(
    State(state): State<AppState<S, U, F>>,
) -> ApiResult<Json<Vec<TagResponse>>>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let tags = state.sql_storage.tags_list().await?;
    Ok(Json(tags.into_iter().map(Into::into).collect()))
}

#[tracing::instrument(skip_all, fields(tag_id = id))]
pub async fn get_tag<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TagResponse>>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    state
        .sql_storage
        .tags_get(id)
        .await?
        .map(|tag| Json(tag.into()))
        .ok_or_else(|| ApiError::not_found("Tag not found."))
}
