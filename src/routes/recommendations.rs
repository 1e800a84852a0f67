use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::MovieCard,
    routes::{extract::ApiQuery, AppState},
    services::{
        enrichment,
        presentation::{self, SortOrder, GRID_COLUMNS},
    },
};

#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    pub title: String,
    /// Comma-separated genre names
    #[serde(default)]
    pub genres: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
}

#[derive(Debug, Deserialize)]
pub struct CollaborativeQuery {
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub title: String,
    pub results: Vec<MovieCard>,
    pub rows: Vec<Vec<MovieCard>>,
}

#[derive(Debug, Serialize)]
pub struct CollaborativeResponse {
    pub title: String,
    pub results: Vec<String>,
}

fn require_title(title: &str) -> AppResult<&str> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidInput("title must not be empty".to_string()));
    }
    Ok(title)
}

/// Handler for content-based recommendations
///
/// Ranked movies are enriched with metadata, then genre-filtered and sorted.
pub async fn content(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    ApiQuery(query): ApiQuery<ContentQuery>,
) -> AppResult<Json<ContentResponse>> {
    let title = require_title(&query.title)?;
    let genres = presentation::parse_genres(query.genres.as_deref());

    tracing::info!(
        request_id = %request_id,
        title = %title,
        genres = ?genres,
        sort = ?query.sort,
        "Processing content recommendation request"
    );

    let ranked = state.engine.recommend_content_based(title)?;
    let cards = enrichment::enrich(state.metadata.clone(), ranked, state.metadata_concurrency).await;

    let mut results = presentation::filter_by_genres(cards, &genres);
    presentation::sort_cards(&mut results, query.sort);
    let rows = presentation::grid(&results, GRID_COLUMNS);

    tracing::info!(
        request_id = %request_id,
        results = results.len(),
        "Content recommendations served"
    );

    Ok(Json(ContentResponse {
        title: title.to_string(),
        results,
        rows,
    }))
}

/// Handler for collaborative-filtering recommendations
pub async fn collaborative(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    ApiQuery(query): ApiQuery<CollaborativeQuery>,
) -> AppResult<Json<CollaborativeResponse>> {
    let title = require_title(&query.title)?;

    tracing::info!(
        request_id = %request_id,
        title = %title,
        "Processing collaborative recommendation request"
    );

    let results = state.engine.recommend_collaborative(title)?;

    tracing::info!(
        request_id = %request_id,
        results = results.len(),
        "Collaborative recommendations served"
    );

    Ok(Json(CollaborativeResponse {
        title: title.to_string(),
        results,
    }))
}
