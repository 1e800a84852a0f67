use axum::{
    http::{Method, StatusCode},
    middleware,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    middleware::{make_span_with_request_id, request_id_middleware},
    services::{MetadataProvider, RecommendationEngine},
};

pub mod discover;
pub mod extract;
pub mod movies;
pub mod recommendations;

/// Shared, read-only application state
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    pub metadata: Arc<dyn MetadataProvider>,
    /// Maximum outstanding metadata calls per enrichment pass
    pub metadata_concurrency: usize,
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies", get(movies::list))
        .route("/movies/:id/details", get(movies::details))
        .route("/genres", get(movies::genres))
        .route("/recommendations/content", get(recommendations::content))
        .route("/recommendations/collaborative", get(recommendations::collaborative))
        .route("/trending", get(discover::trending))
        .route("/now-playing", get(discover::now_playing))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
