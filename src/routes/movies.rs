use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    models::{MovieDetails, MovieId, RecommendationMode},
    routes::{
        extract::{ApiPath, ApiQuery},
        AppState,
    },
    services::presentation::FILTER_GENRES,
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_mode")]
    pub mode: RecommendationMode,
}

fn default_mode() -> RecommendationMode {
    RecommendationMode::Content
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub mode: RecommendationMode,
    pub titles: Vec<String>,
}

/// Handler listing the titles a user can pick for a mode
pub async fn list(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Json<ListResponse> {
    Json(ListResponse {
        mode: query.mode,
        titles: state.engine.titles(query.mode),
    })
}

/// Handler for a single movie's display metadata
pub async fn details(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<u64>,
) -> Json<MovieDetails> {
    Json(state.metadata.fetch_details(MovieId(id)).await)
}

/// Handler listing the genres accepted by the content filter
pub async fn genres() -> Json<Vec<&'static str>> {
    Json(FILTER_GENRES.to_vec())
}
