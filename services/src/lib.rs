use crate::config::Config;
use crate::database::SqlStorage;
use crate::state::AppState;
use crate::storage::FileStorage;
use crate::users::UserStorage;
use axum::{
    Router,
    extract::{Extension, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{any, get},
};
use opentelemetry::{global, propagation::Extractor};
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub mod boards;
pub mod config;
pub mod database;
pub mod state;
pub mod storage;
pub mod telemetry;
pub mod users;

struct HeaderExtractor<'a>(&'a HeaderMap);

impl<'a> Extractor for HeaderExtractor<'a> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Builds the service router over the given storages.
pub fn routes<S, U, F>(sql_storage: S, user_storage: U, file_storage: F, config: Config) -> Router
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let state = AppState::new(sql_storage, user_storage, file_storage);

    Router::new()
        .route("/is-health", get(health_check::<S, U, F>))
        .nest("/boards", boards::routes::<S, U, F>())
        .fallback(any(catch_all))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                // Continue the caller's trace when one is propagated
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
        tracing::warn!("Health check failed: database unreachable");
        (StatusCode::BAD_GATEWAY, "502").into_response()
    };

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&config.environment().to_string()) {
        headers.insert(HeaderName::from_static("x-service-env"), value);
    }
    if let Ok(value) = HeaderValue::from_str(&config.environment().version_label()) {
        headers.insert(HeaderName::from_static("x-service-version"), value);
    }

    response
}

async fn catch_all() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
