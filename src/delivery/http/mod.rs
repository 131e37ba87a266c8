pub mod v1;
pub mod views;

use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, OriginalUri, State},
    http::{HeaderValue, header},
    middleware::from_fn_with_state,
    routing::get,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::AppState;
use crate::usecase::error::UsecaseError;
use v1::middleware::{format_errors, identify, protect};

/// JSON and form bodies.
const BODY_LIMIT_BYTES: usize = 10 * 1024;
/// Hard cap for every request; routes taking image uploads raise their
/// extractor limit up to it.
pub const UPLOAD_LIMIT_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: Arc<AppState>) -> Router {
    let pages = Router::new()
        .route("/", get(views::overview))
        .route("/tour/{slug}", get(views::tour))
        .route("/login", get(views::login).post(views::submit_login))
        .route_layer(from_fn_with_state(state.clone(), identify));

    let account_pages = Router::new()
        .route("/me", get(views::account))
        .route("/my-tours", get(views::my_tours))
        .route_layer(from_fn_with_state(state.clone(), protect));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .merge(pages)
        .merge(account_pages)
        .nest("/api/v1", v1::api_router(&state))
        .nest_service("/img", ServeDir::new(state.images.root()))
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), format_errors))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(RequestBodyLimitLayer::new(UPLOAD_LIMIT_BYTES))
        .layer(CompressionLayer::new())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains"),
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(OriginalUri(uri): OriginalUri) -> UsecaseError {
    UsecaseError::NotFound(format!("Can't find {uri} on this server!"))
}

async fn metrics(State(state): State<Arc<AppState>>) -> String {
    metrics_process::Collector::default().collect();
    state.metrics_handle.render()
}

#[tracing::instrument]
async fn healthz() -> &'static str {
    "OK"
}
