use crate::error::ApiResult;
use crate::media::FileStorage;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

/// `GET /media/{*path}`: streams a stored file back.
#[tracing::instrument(skip_all, fields(path = %path))]
pub async fn serve_media<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Path(path): Path<String>,
) -> ApiResult<Response>
where
    S: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
    F: FileStorage,
{
    let content = state.file_storage.download_file(&path).await?;
    let content_type = mime_guess::from_path(&path).first_or_octet_stream();

    Ok(([(header::CONTENT_TYPE, content_type.to_string())], content).into_response())
}
