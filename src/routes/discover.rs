use axum::{extract::State, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{MovieCard, NowPlaying},
    routes::AppState,
    services::enrichment,
};

/// Movies shown in each discovery panel
pub const PANEL_SIZE: usize = 5;

/// Handler for the most popular catalog movies
pub async fn trending(State(state): State<Arc<AppState>>) -> Json<Vec<MovieCard>> {
    let movies = state.engine.trending(PANEL_SIZE);
    Json(enrichment::enrich(state.metadata.clone(), movies, state.metadata_concurrency).await)
}

/// Handler for movies currently in theaters
pub async fn now_playing(State(state): State<Arc<AppState>>) -> AppResult<Json<NowPlaying>> {
    let listing = state.metadata.now_playing(PANEL_SIZE).await.map_err(|e| {
        tracing::warn!(error = %e, provider = state.metadata.name(), "Failed to fetch new releases");
        e
    })?;

    let movies = enrichment::enrich(state.metadata.clone(), listing, state.metadata_concurrency).await;

    Ok(Json(NowPlaying {
        movies,
        fetched_at: Utc::now(),
    }))
}
