use crate::database::SqlStorage;
use crate::error::ApiResult;
use crate::media::FileStorage;
use crate::shopping::{EXPORT_CONTENT_TYPE, EXPORT_DISPOSITION, footer, render_export};
use crate::state::AppState;
use crate::users::session_auth::RequireAuth;
use crate::users::storage::UserStorage;
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Datelike;

/// `GET /api/recipes/download_shopping_cart/`: the aggregated cart as a
/// plain-text attachment.
#[tracing::instrument(skip_all, fields(user_id = auth.user_id()))]
pub async fn download_shopping_cart<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    auth: RequireAuth,
) -> ApiResult<Response>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let rows = state
        .sql_storage
        .shopping_cart_ingredients(auth.user_id())
        .await?;
    tracing::debug!(lines = rows.len(), "rendering shopping list");

    let body = render_export(rows, &footer(chrono::Utc::now().year()));

    Ok((
        [
            (header::CONTENT_TYPE, EXPORT_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, EXPORT_DISPOSITION),
        ],
        body,
    )
        .into_response())
}
