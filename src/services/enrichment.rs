use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::{
    models::{CatalogMovie, MovieCard, MovieDetails},
    services::providers::MetadataProvider,
};

/// Attaches display metadata to ranked movies
///
/// Fetches run in parallel with at most `concurrency` calls outstanding. The output
/// keeps the input order regardless of which fetch finishes first, and a fetch task
/// that dies yields the placeholder record.
pub async fn enrich(
    provider: Arc<dyn MetadataProvider>,
    movies: Vec<CatalogMovie>,
    concurrency: usize,
) -> Vec<MovieCard> {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = Vec::with_capacity(movies.len());

    for movie in movies {
        let provider = provider.clone();
        let permits = permits.clone();
        let movie_id = movie.movie_id;
        let task = tokio::spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            provider.fetch_details(movie_id).await
        });
        tasks.push((movie, task));
    }

    let mut cards = Vec::with_capacity(tasks.len());
    let mut fallbacks = 0usize;

    for (movie, task) in tasks {
        let details = match task.await {
            Ok(details) => details,
            Err(e) => {
                tracing::error!(error = %e, movie_id = %movie.movie_id, "Metadata task join error");
                MovieDetails::placeholder()
            }
        };
        if details.is_placeholder() {
            fallbacks += 1;
        }
        cards.push(MovieCard {
            movie_id: movie.movie_id,
            title: movie.title,
            details,
        });
    }

    if fallbacks > 0 {
        tracing::warn!(
            total = cards.len(),
            placeholders = fallbacks,
            provider = provider.name(),
            "Some movies are shown without metadata"
        );
    }

    cards
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetadataError;
    use crate::models::MovieId;
    use crate::services::providers::MockMetadataProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn movies(ids: &[u64]) -> Vec<CatalogMovie> {
        ids.iter()
            .map(|&id| CatalogMovie {
                movie_id: MovieId(id),
                title: format!("Movie {}", id),
            })
            .collect()
    }

    fn details_for(id: MovieId) -> MovieDetails {
        MovieDetails {
            poster: format!("https://image.tmdb.org/t/p/w500/{}.jpg", id),
            vote_average: "7.0".to_string(),
            release_year: "2001".to_string(),
            genres: "Drama".to_string(),
            homepage: "#".to_string(),
        }
    }

    #[tokio::test]
    async fn test_enrich_attaches_details() {
        let mut mock = MockMetadataProvider::new();
        mock.expect_fetch_details()
            .times(3)
            .returning(|id| if id == MovieId(2) { MovieDetails::placeholder() } else { details_for(id) });
        mock.expect_name().return_const("mock");

        let cards = enrich(Arc::new(mock), movies(&[1, 2, 3]), 4).await;

        assert_eq!(cards.len(), 3);
        assert_eq!(cards[0].details, details_for(MovieId(1)));
        assert!(cards[1].details.is_placeholder());
        assert_eq!(cards[2].title, "Movie 3");
    }

    #[test]
    fn test_enrich_empty_input() {
        let mock = MockMetadataProvider::new();
        let cards = tokio_test::block_on(enrich(Arc::new(mock), Vec::new(), 4));
        assert!(cards.is_empty());
    }

    /// Provider whose later-ranked movies answer first and which records peak parallelism
    struct SlowProvider {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MetadataProvider for SlowProvider {
        async fn fetch_details(&self, movie_id: MovieId) -> MovieDetails {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(60 - 10 * movie_id.0)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            details_for(movie_id)
        }

        async fn now_playing(&self, _limit: usize) -> Result<Vec<CatalogMovie>, MetadataError> {
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_enrich_preserves_rank_order_and_bounds_concurrency() {
        let provider = Arc::new(SlowProvider {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });

        let cards = enrich(provider.clone(), movies(&[1, 2, 3, 4, 5]), 2).await;

        let ids: Vec<u64> = cards.iter().map(|c| c.movie_id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert!(provider.peak.load(Ordering::SeqCst) <= 2);
    }
}
