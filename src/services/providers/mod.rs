//! Movie metadata provider abstraction
//!
//! The recommendation engine only deals in identifiers and titles; providers turn an
//! identifier into display metadata and supply the now-playing listing.

use crate::{
    error::MetadataError,
    models::{CatalogMovie, MovieDetails, MovieId},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Trait for movie metadata providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch display metadata for one movie
    ///
    /// Never fails: any network, status or parsing problem yields
    /// [`MovieDetails::placeholder`].
    async fn fetch_details(&self, movie_id: MovieId) -> MovieDetails;

    /// Fetch the first `limit` movies currently in theaters
    async fn now_playing(&self, limit: usize) -> Result<Vec<CatalogMovie>, MetadataError>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
