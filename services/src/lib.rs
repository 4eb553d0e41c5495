//! Foodgram backend: recipes, favorites, shopping lists and follows over a
//! JSON HTTP API.

use crate::config::Config;
use crate::database::SqlStorage;
use crate::error::ErrorBody;
use crate::media::FileStorage;
use crate::state::AppState;
use crate::users::storage::UserStorage;
use axum::{
    Json, Router,
    extract::{Extension, Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{any, get},
};
use foodgram_utils::version_info::{RuntimeEnv, format_version_for_runtime_env};
use opentelemetry::{global, propagation::Extractor};
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod media;
pub mod pagination;
pub mod shopping;
pub mod state;
pub mod telemetry;
pub mod users;

struct HeaderExtractor<'a>(&'a axum::http::HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Builds the application router over the given storage backends.
pub fn routes<S, U, F>(sql_storage: S, user_storage: U, file_storage: F, config: Config) -> Router
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let state = AppState::new(sql_storage, user_storage, file_storage);

    Router::new()
        .route("/is-health", get(health_check::<S, U, F>))
        .route("/media/{*path}", get(api::media::serve_media::<S, U, F>))
        .nest("/api", api::routes::<S, U, F>())
        .fallback(any(catch_all))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                // Continue the caller's trace when it sent a context header
                let parent_context = global::get_text_map_propagator(|propagator| {
                    propagator.extract(&HeaderExtractor(request.headers()))
                });

                let span = tracing::info_span!(
                    "http_request",
                    http_request.method = ?request.method(),
                    http_request.uri = ?request.uri(),
                    http_request.version = ?request.version(),
                    http_request.user_agent = ?request.headers().get(axum::http::header::USER_AGENT),
                );
                span.set_parent(parent_context);

                span
            }),
        )
        .layer(Extension(config))
        .with_state(state)
}

async fn health_check<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Extension(config): Extension<Config>,
) -> impl IntoResponse
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let mut response = if state.sql_storage.is_connected().await {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::BAD_GATEWAY, "502").into_response()
    };

    let env_value = config.environment().to_string();
    response.headers_mut().insert(
        HeaderName::from_static("x-service-env"),
        HeaderValue::from_str(&env_value).expect("environment header is valid ASCII"),
    );

    let runtime_env: RuntimeEnv = config.environment().into();
    let version_value = format_version_for_runtime_env(runtime_env);
    response.headers_mut().insert(
        HeaderName::from_static("x-service-version"),
        HeaderValue::from_str(&version_value).expect("version header is valid ASCII"),
    );

    response
}

async fn catch_all() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "not_found",
            message: "Not found.".to_owned(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MockSqlStorage;
    use crate::media::MockFileStorage;
    use crate::users::storage::MockUserStorage;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    fn app(sql_storage: MockSqlStorage) -> Router {
        routes(
            sql_storage,
            MockUserStorage::new(),
            MockFileStorage::new(),
            Config::new_for_test(),
        )
    }

    #[tokio::test]
    async fn health_check_when_connected() {
        let response = app(MockSqlStorage::new())
            .oneshot(Request::get("/is-health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("x-service-env").unwrap(), "local");
        assert!(
            response
                .headers()
                .get("x-service-version")
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("main:")
        );
    }

    #[tokio::test]
    async fn health_check_when_disconnected() {
        let response = app(MockSqlStorage::disconnected())
            .oneshot(Request::get("/is-health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn unknown_routes_get_json_404() {
        let response = app(MockSqlStorage::new())
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "not_found");
    }
}
