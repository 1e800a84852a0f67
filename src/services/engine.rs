use std::collections::HashSet;
use tracing::instrument;

use crate::{
    error::RecommendError,
    models::{CatalogMovie, MovieId, RecommendationMode},
    store::{CollaborativeStore, ContentStore},
};

/// Maximum content-mode results
pub const CONTENT_RESULT_LIMIT: usize = 8;
/// Maximum collaborative-mode results
pub const COLLABORATIVE_RESULT_LIMIT: usize = 5;
/// Neighbours requested from the index: the query row plus the result bound
const COLLABORATIVE_NEIGHBORS: usize = COLLABORATIVE_RESULT_LIMIT + 1;

/// Answers "movies like this one" over the precomputed stores
///
/// Holds only immutable data, so a single instance can be shared across request
/// handlers without locking.
pub struct RecommendationEngine {
    content: ContentStore,
    collaborative: CollaborativeStore,
}

impl RecommendationEngine {
    pub fn new(content: ContentStore, collaborative: CollaborativeStore) -> Self {
        Self {
            content,
            collaborative,
        }
    }

    /// Most similar movies by content score
    ///
    /// The title resolves to its first catalog row. Candidates are ranked by descending
    /// score with equal scores kept in row order, the query row itself is excluded by
    /// position, and at most [`CONTENT_RESULT_LIMIT`] movies are returned.
    #[instrument(level = "debug", skip(self))]
    pub fn recommend_content_based(&self, title: &str) -> Result<Vec<CatalogMovie>, RecommendError> {
        let query_row =
            self.content
                .resolve_title(title)
                .ok_or_else(|| RecommendError::TitleNotFound {
                    title: title.to_string(),
                    mode: RecommendationMode::Content,
                })?;

        let scores = self
            .content
            .similarity_row(query_row)
            .ok_or_else(|| RecommendError::Resolution {
                row: query_row,
                reason: "catalog row has no similarity scores".to_string(),
            })?;

        let query_id = self.content.entry(query_row).map(|e| e.movie_id);
        let mut seen: HashSet<MovieId> = query_id.into_iter().collect();

        let results: Vec<CatalogMovie> = rank_by_score(scores)
            .into_iter()
            .filter(|&row| row != query_row)
            .filter_map(|row| self.content.movie(row))
            .filter(|movie| seen.insert(movie.movie_id))
            .take(CONTENT_RESULT_LIMIT)
            .collect();

        tracing::debug!(
            title = %title,
            row = query_row,
            results = results.len(),
            "Content recommendations ranked"
        );

        Ok(results)
    }

    /// Nearest neighbours of the title's rating vector
    ///
    /// Fails only when the title is unknown or has no rating row. Neighbours whose
    /// movie cannot be mapped back to a title are skipped with a warning, and any
    /// failure inside the neighbour lookup degrades to an empty list.
    #[instrument(level = "debug", skip(self))]
    pub fn recommend_collaborative(&self, title: &str) -> Result<Vec<String>, RecommendError> {
        let movie_id =
            self.collaborative
                .resolve_title(title)
                .ok_or_else(|| RecommendError::TitleNotFound {
                    title: title.to_string(),
                    mode: RecommendationMode::Collaborative,
                })?;

        let query_row = self
            .collaborative
            .row_of(movie_id)
            .ok_or_else(|| RecommendError::MissingRow {
                title: title.to_string(),
                movie_id,
            })?;

        match self.nearest_titles(query_row) {
            Ok(titles) => Ok(titles),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    title = %title,
                    row = query_row,
                    "Collaborative lookup failed, returning no recommendations"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Titles recommended for `title` under either mode
    pub fn recommend_titles_for(
        &self,
        title: &str,
        mode: RecommendationMode,
    ) -> Result<Vec<String>, RecommendError> {
        match mode {
            RecommendationMode::Content => Ok(self
                .recommend_content_based(title)?
                .into_iter()
                .map(|m| m.title)
                .collect()),
            RecommendationMode::Collaborative => self.recommend_collaborative(title),
        }
    }

    /// Selectable titles of a mode, in catalog order
    pub fn titles(&self, mode: RecommendationMode) -> Vec<String> {
        match mode {
            RecommendationMode::Content => self.content.titles().map(str::to_string).collect(),
            RecommendationMode::Collaborative => {
                self.collaborative.titles().map(str::to_string).collect()
            }
        }
    }

    /// Most popular content-catalog movies
    pub fn trending(&self, n: usize) -> Vec<CatalogMovie> {
        self.content.most_popular(n)
    }

    fn nearest_titles(&self, query_row: usize) -> Result<Vec<String>, RecommendError> {
        let index = self.collaborative.index();
        let query = index.row(query_row).ok_or_else(|| {
            RecommendError::Neighbor(format!("row {} is missing from the rating matrix", query_row))
        })?;

        let neighbors = index.k_nearest(&query, COLLABORATIVE_NEIGHBORS)?;

        if let Some(first) = neighbors.first().filter(|n| n.row != query_row) {
            tracing::warn!(
                query_row,
                first_row = first.row,
                distance = first.distance,
                "Nearest neighbour is not the query row itself"
            );
        }

        let mut titles = Vec::with_capacity(COLLABORATIVE_RESULT_LIMIT);
        for neighbor in neighbors
            .iter()
            .filter(|n| n.row != query_row)
            .take(COLLABORATIVE_RESULT_LIMIT)
        {
            match self.neighbor_title(neighbor.row) {
                Ok(title) => titles.push(title),
                Err(e) => tracing::warn!(error = %e, "Skipping unresolved neighbour"),
            }
        }

        Ok(titles)
    }

    fn neighbor_title(&self, row: usize) -> Result<String, RecommendError> {
        let movie_id = self
            .collaborative
            .movie_at_row(row)
            .ok_or_else(|| RecommendError::Resolution {
                row,
                reason: "row is not in the row index".to_string(),
            })?;

        self.collaborative
            .title_of(movie_id)
            .map(str::to_string)
            .ok_or_else(|| RecommendError::Resolution {
                row,
                reason: format!("movie {} is not in the collaborative catalog", movie_id),
            })
    }
}

/// Row positions ordered by descending score; equal scores keep row order
fn rank_by_score(scores: &[f32]) -> Vec<usize> {
    let mut ranked: Vec<usize> = (0..scores.len()).collect();
    ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    ranked
}
