//! Follow / unfollow and the subscriptions list.

use super::session_auth::RequireAuth;
use super::storage::UserStorage;
use crate::api::present;
use crate::api::types::SubscriptionResponse;
use crate::config::Config;
use crate::database::{Presence, Removal, SqlStorage};
use crate::error::{ApiError, ApiResult};
use crate::media::FileStorage;
use crate::pagination::{Page, PageRequest, RequestUrl};
use crate::state::{AppState, Ctx};
use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Recipes shown per author; all when absent.
    pub recipes_limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscribeQuery {
    pub recipes_limit: Option<u32>,
}

#[tracing::instrument(skip_all, fields(user_id = auth.user_id(), page = ?query.page))]
pub async fn list_subscriptions<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Extension(config): Extension<Config>,
    auth: RequireAuth,
    url: RequestUrl,
    Query(query): Query<SubscriptionQuery>,
) -> ApiResult<Json<Page<SubscriptionResponse>>>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let page = PageRequest::new(query.page, query.limit, config.page_size())?;
    let (author_ids, total) = state
        .sql_storage
        .follows_list(auth.user_id(), page.limit(), page.offset())
        .await?;
    page.ensure_in_range(total)?;

    let ctx = Ctx {
        state: &state,
        config: &config,
        viewer: Some(auth.user_id()),
    };
    let recipes_limit = query.recipes_limit.map(i64::from);
    let mut results = Vec::with_capacity(author_ids.len());
    for author_id in author_ids {
        // Follow rows cascade with users, so a miss is a concurrent delete
        let Some(author) = state.user_storage.get_user(author_id).await? else {
            continue;
        };
        results.push(present::subscription(ctx, author, recipes_limit).await?);
    }

    Ok(Json(Page::new(results, total, page, &url)))
}

#[tracing::instrument(skip_all, fields(user_id = auth.user_id(), author_id = id))]
pub async fn subscribe<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Extension(config): Extension<Config>,
    auth: RequireAuth,
    Path(id): Path<i64>,
    Query(query): Query<SubscribeQuery>,
) -> ApiResult<(StatusCode, Json<SubscriptionResponse>)>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let author = state
        .user_storage
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found."))?;
    if author.id == auth.user_id() {
        tracing::warn!("self follow rejected");
        return Err(ApiError::bad_request("You cannot subscribe to yourself."));
    }

    match state.sql_storage.follows_add(auth.user_id(), author.id).await? {
        Presence::Created => tracing::info!("subscribed"),
        Presence::AlreadyPresent => {
            tracing::warn!("already subscribed");
            return Err(ApiError::bad_request("You are already subscribed to this user."));
        }
    }

    let ctx = Ctx {
        state: &state,
        config: &config,
        viewer: Some(auth.user_id()),
    };
    let response =
        present::subscription(ctx, author, query.recipes_limit.map(i64::from)).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[tracing::instrument(skip_all, fields(user_id = auth.user_id(), author_id = id))]
pub async fn unsubscribe<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    if state.user_storage.get_user(id).await?.is_none() {
        return Err(ApiError::not_found("User not found."));
    }
    if id == auth.user_id() {
        return Err(ApiError::bad_request("You cannot unsubscribe from yourself."));
    }

    match state.sql_storage.follows_remove(auth.user_id(), id).await? {
        Removal::Deleted => {
            tracing::info!("unsubscribed");
            Ok(StatusCode::NO_CONTENT)
        }
        Removal::AlreadyAbsent => {
            tracing::warn!("not subscribed");
            Err(ApiError::bad_request("You are not subscribed to this user."))
        }
    }
}
