//! API route definitions

use std::sync::Arc;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::{handlers, state::AppState};

async fn handle_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

async fn handle_405() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, Json(json!({ "error": "Method not allowed" })))
}

/// Routes for the state's variant
pub fn create_router(state: Arc<AppState>) -> Router {
    let max_upload_size = state.config.max_upload_size;

    let routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/train", post(handlers::train))
        .route("/predict", post(handlers::predict))
        .route("/model_info", get(handlers::model_info));

    let routes = if state.variant().is_custom() {
        routes
            .route("/model/info", get(handlers::model_info))
            .route("/model/delete", delete(handlers::delete_model))
            .route("/features", get(handlers::features))
            .route("/supported_formats", get(handlers::supported_formats))
    } else {
        routes
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes
        .fallback(handle_404)
        .method_not_allowed_fallback(handle_405)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_size))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
