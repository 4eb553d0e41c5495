//! User registration, profile and token endpoints.

use super::password::{hash_password, verify_password};
use super::session_auth::{MaybeAuth, RequireAuth};
use super::storage::{NewUser, StoredUser, UserStorage};
use super::token::generate_session_token;
use crate::api::present;
use crate::api::types::{CreatedUserResponse, UserResponse};
use crate::config::Config;
use crate::database::SqlStorage;
use crate::error::{ApiError, ApiResult};
use crate::media::FileStorage;
use crate::pagination::{Page, PageRequest, RequestUrl};
use crate::state::{AppState, Ctx};
use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Letters, digits and `.@+-_`; `me` is reserved for the profile route.
fn validate_username(username: &str) -> Result<(), validator::ValidationError> {
    if username == "me" {
        return Err(validator::ValidationError::new("reserved_username")
            .with_message("this username is reserved".into()));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_'))
    {
        return Err(validator::ValidationError::new("invalid_username").with_message(
            "may contain only letters, digits and the characters . @ + - _".into(),
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "enter a valid email address"), length(max = 254))]
    pub email: String,
    #[validate(
        length(min = 1, max = 150),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(length(min = 1, max = 150))]
    pub first_name: String,
    #[validate(length(min = 1, max = 150))]
    pub last_name: String,
    #[validate(length(min = 8, max = 150))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetPasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8, max = 150))]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub auth_token: String,
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

async fn load_user<U: UserStorage>(storage: &U, id: i64) -> ApiResult<StoredUser> {
    storage
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found."))
}

#[tracing::instrument(skip_all, fields(username = %payload.username))]
pub async fn register<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    WithRejection(Json(payload), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<CreatedUserResponse>)>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    payload.validate().inspect_err(|e| {
        tracing::warn!(error = %e, "rejected registration");
    })?;

    let password_hash =
        hash_password(&payload.password).map_err(|e| ApiError::Internal(e.to_string()))?;
    let user = state
        .user_storage
        .create_user(NewUser {
            email: payload.email,
            username: payload.username,
            first_name: payload.first_name,
            last_name: payload.last_name,
            password_hash,
        })
        .await?;
    tracing::info!(user_id = user.id, "user registered");

    Ok((StatusCode::CREATED, Json(user.into())))
}

#[tracing::instrument(skip_all, fields(page = ?query.page))]
pub async fn list_users<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Extension(config): Extension<Config>,
    auth: MaybeAuth,
    url: RequestUrl,
    Query(query): Query<UserListQuery>,
) -> ApiResult<Json<Page<UserResponse>>>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let page = PageRequest::new(query.page, query.limit, config.page_size())?;
    let total = state.user_storage.users_count().await?;
    page.ensure_in_range(total)?;
    let users = state
        .user_storage
        .list_users(page.limit(), page.offset())
        .await?;

    let ctx = Ctx {
        state: &state,
        config: &config,
        viewer: auth.user_id(),
    };
    let mut results = Vec::with_capacity(users.len());
    for user in users {
        results.push(present::user(ctx, user).await?);
    }
    Ok(Json(Page::new(results, total, page, &url)))
}

#[tracing::instrument(skip_all, fields(user_id = id))]
pub async fn get_user<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Extension(config): Extension<Config>,
    auth: MaybeAuth,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserResponse>>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let user = load_user(&state.user_storage, id).await?;
    let ctx = Ctx {
        state: &state,
        config: &config,
        viewer: auth.user_id(),
    };
    Ok(Json(present::user(ctx, user).await?))
}

#[tracing::instrument(skip_all, fields(user_id = auth.user_id()))]
pub async fn me<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Extension(config): Extension<Config>,
    auth: RequireAuth,
) -> ApiResult<Json<UserResponse>>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    // A token can outlive its user
    let user = state
        .user_storage
        .get_user(auth.user_id())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists.".to_owned()))?;
    let ctx = Ctx {
        state: &state,
        config: &config,
        viewer: Some(auth.user_id()),
    };
    Ok(Json(present::user(ctx, user).await?))
}

#[tracing::instrument(skip_all, fields(user_id = auth.user_id()))]
pub async fn set_password<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    auth: RequireAuth,
    WithRejection(Json(payload), _): WithRejection<Json<SetPasswordRequest>, ApiError>,
) -> ApiResult<StatusCode>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let user = state
        .user_storage
        .get_user(auth.user_id())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists.".to_owned()))?;

    if !verify_password(&payload.current_password, &user.password_hash) {
        tracing::warn!("current password mismatch");
        return Err(ApiError::field("current_password", "invalid password"));
    }
    payload.validate()?;

    let password_hash =
        hash_password(&payload.new_password).map_err(|e| ApiError::Internal(e.to_string()))?;
    state
        .user_storage
        .update_password_hash(user.id, &password_hash)
        .await?;
    tracing::info!("password changed");

    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip_all)]
pub async fn login<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Extension(config): Extension<Config>,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> ApiResult<Json<LoginResponse>>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let invalid = || ApiError::bad_request("Unable to log in with provided credentials.");

    let user = state
        .user_storage
        .get_user_by_email(payload.email.trim())
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&payload.password, &user.password_hash) {
        tracing::warn!(user_id = user.id, "login with wrong password");
        return Err(invalid());
    }

    let auth_token =
        generate_session_token(user.id, config.jwt_secret(), config.session_ttl_seconds())
            .map_err(|e| ApiError::Internal(e.to_string()))?;
    tracing::info!(user_id = user.id, "session token issued");

    Ok(Json(LoginResponse { auth_token }))
}

/// Tokens are stateless; logging out only requires a valid token.
#[tracing::instrument(skip_all, fields(user_id = auth.user_id()))]
pub async fn logout(auth: RequireAuth) -> StatusCode {
    tracing::info!("logged out");
    StatusCode::NO_CONTENT
}
