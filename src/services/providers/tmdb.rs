//! TMDb metadata provider
//!
//! API Flow:
//! 1. Details: /movie/{id} → poster, rating, release date, genres, homepage
//! 2. Now playing: /movie/now_playing → ids and titles of current releases

use crate::{
    cache::{Cache, CacheKey},
    cached,
    config::Config,
    error::MetadataError,
    models::{CatalogMovie, MovieDetails, MovieId, TmdbListing, TmdbMovieDetails},
    services::providers::MetadataProvider,
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

const DETAILS_CACHE_TTL: u64 = 604800; // 1 week
const NOW_PLAYING_CACHE_TTL: u64 = 3600; // 1 hour

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    image_url: String,
    language: String,
    cache: Cache,
}

impl TmdbProvider {
    /// Creates a provider whose requests all carry the configured timeout
    pub fn new(config: &Config, cache: Cache) -> Result<Self, MetadataError> {
        let http_client = HttpClient::builder()
            .timeout(config.metadata_timeout())
            .build()?;

        Ok(Self {
            http_client,
            api_key: config.tmdb_api_key.clone(),
            api_url: config.tmdb_api_url.trim_end_matches('/').to_string(),
            image_url: config.tmdb_image_url.clone(),
            language: config.tmdb_language.clone(),
            cache,
        })
    }

    /// GET `path` with the credential and locale attached, decoding a JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        extra_query: &[(&str, &str)],
    ) -> Result<T, MetadataError> {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .query(extra_query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MetadataError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::debug!(error = %e, path = %path, "Failed to deserialize TMDb response");
            MetadataError::Parse(e)
        })
    }

    async fn try_fetch_details(&self, movie_id: MovieId) -> Result<MovieDetails, MetadataError> {
        cached!(
            self.cache,
            CacheKey::MovieDetails(movie_id),
            DETAILS_CACHE_TTL,
            async move {
                let raw: TmdbMovieDetails =
                    self.get_json(&format!("/movie/{}", movie_id), &[]).await?;
                let details = raw.into_details(&self.image_url);

                tracing::debug!(
                    movie_id = %movie_id,
                    year = %details.release_year,
                    provider = "tmdb",
                    "Details fetched"
                );

                Ok::<_, MetadataError>(details)
            }
        )
    }

    async fn fetch_now_playing_listing(&self) -> Result<Vec<CatalogMovie>, MetadataError> {
        cached!(
            self.cache,
            CacheKey::NowPlaying(self.language.clone()),
            NOW_PLAYING_CACHE_TTL,
            async move {
                let listing: TmdbListing =
                    self.get_json("/movie/now_playing", &[("page", "1")]).await?;
                let movies: Vec<CatalogMovie> =
                    listing.results.into_iter().map(CatalogMovie::from).collect();

                tracing::info!(
                    results = movies.len(),
                    provider = "tmdb",
                    "Now playing listing fetched"
                );

                Ok::<_, MetadataError>(movies)
            }
        )
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn fetch_details(&self, movie_id: MovieId) -> MovieDetails {
        match self.try_fetch_details(movie_id).await {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!(
                    movie_id = %movie_id,
                    error = %e,
                    provider = "tmdb",
                    "Details unavailable, using placeholder"
                );
                MovieDetails::placeholder()
            }
        }
    }

    async fn now_playing(&self, limit: usize) -> Result<Vec<CatalogMovie>, MetadataError> {
        let movies = self.fetch_now_playing_listing().await?;
        Ok(movies.into_iter().take(limit).collect())
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};

    fn test_config(api_url: &str) -> Config {
        Config::from_vars(vec![
            ("TMDB_API_KEY".to_string(), "test_key".to_string()),
            ("TMDB_API_URL".to_string(), api_url.to_string()),
            ("METADATA_TIMEOUT_SECS".to_string(), "1".to_string()),
        ])
        .unwrap()
    }

    /// Nothing listens on port 1, so every request fails fast
    fn unreachable_provider() -> TmdbProvider {
        TmdbProvider::new(&test_config("http://127.0.0.1:1/3/"), Cache::in_memory()).unwrap()
    }

    /// Serves `app` on an ephemeral local port, returning the TMDb-style base URL
    async fn spawn_stub(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/3", address)
    }

    async fn provider_against(app: Router) -> TmdbProvider {
        let base = spawn_stub(app).await;
        TmdbProvider::new(&test_config(&base), Cache::in_memory()).unwrap()
    }

    async fn cached_details(provider: &TmdbProvider, movie_id: MovieId) -> Option<MovieDetails> {
        provider
            .cache
            .get_from_cache(&CacheKey::MovieDetails(movie_id), DETAILS_CACHE_TTL)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_error_status_yields_placeholder() {
        let provider = provider_against(Router::new().fallback(|| async {
            (StatusCode::UNAUTHORIZED, "Invalid API key: You must be granted a valid key.")
        }))
        .await;

        assert_eq!(provider.fetch_details(MovieId(19995)).await, MovieDetails::placeholder());
        assert_eq!(cached_details(&provider, MovieId(19995)).await, None);

        match provider.now_playing(5).await {
            Err(MetadataError::Status { status, body }) => {
                assert_eq!(status, 401);
                assert!(body.contains("Invalid API key"));
            }
            other => panic!("expected a status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_yields_placeholder() {
        let provider = provider_against(Router::new().fallback(|| async {
            ([("content-type", "application/json")], "{\"poster_path\":")
        }))
        .await;

        assert_eq!(provider.fetch_details(MovieId(19995)).await, MovieDetails::placeholder());
        assert_eq!(cached_details(&provider, MovieId(19995)).await, None);
        assert!(matches!(provider.now_playing(5).await, Err(MetadataError::Parse(_))));
    }

    #[tokio::test]
    async fn test_stale_cache_entry_is_refetched_and_replaced() {
        let provider = provider_against(Router::new().route(
            "/3/movie/7",
            get(|| async {
                (
                    [("content-type", "application/json")],
                    r#"{"poster_path":"/p.jpg","vote_average":7.26,"release_date":"2009-12-10","genres":[{"name":"Action"}],"homepage":""}"#,
                )
            }),
        ))
        .await;

        provider.cache.set_in_background(
            &CacheKey::MovieDetails(MovieId(7)),
            &vec!["old", "shape"],
            DETAILS_CACHE_TTL,
        );

        let details = provider.fetch_details(MovieId(7)).await;
        assert_eq!(details.vote_average, "7.3");
        assert_eq!(details.release_year, "2009");
        assert_eq!(details.poster, "https://image.tmdb.org/t/p/w500/p.jpg");
        assert_eq!(cached_details(&provider, MovieId(7)).await, Some(details));
    }

    #[test]
    fn test_api_url_trailing_slash_trimmed() {
        let provider = unreachable_provider();
        assert_eq!(provider.api_url, "http://127.0.0.1:1/3");
        assert_eq!(provider.name(), "tmdb");
    }

    #[tokio::test]
    async fn test_fetch_failure_yields_placeholder() {
        let provider = unreachable_provider();
        let details = provider.fetch_details(MovieId(19995)).await;
        assert_eq!(details, MovieDetails::placeholder());
    }

    #[tokio::test]
    async fn test_placeholder_is_not_cached() {
        let provider = unreachable_provider();
        provider.fetch_details(MovieId(19995)).await;

        let cached: Option<MovieDetails> = provider
            .cache
            .get_from_cache(&CacheKey::MovieDetails(MovieId(19995)), DETAILS_CACHE_TTL)
            .await
            .unwrap();
        assert_eq!(cached, None);
    }

    #[tokio::test]
    async fn test_cached_details_skip_the_network() {
        let provider = unreachable_provider();
        let details = MovieDetails {
            poster: "https://image.tmdb.org/t/p/w500/poster.jpg".to_string(),
            vote_average: "7.3".to_string(),
            release_year: "2009".to_string(),
            genres: "Action, Adventure".to_string(),
            homepage: "#".to_string(),
        };
        provider.cache.set_in_background(
            &CacheKey::MovieDetails(MovieId(19995)),
            &details,
            DETAILS_CACHE_TTL,
        );

        assert_eq!(provider.fetch_details(MovieId(19995)).await, details);
    }

    #[tokio::test]
    async fn test_now_playing_failure_is_surfaced() {
        let provider = unreachable_provider();
        let result = provider.now_playing(5).await;
        assert!(matches!(result, Err(MetadataError::Http(_))));
    }

    #[tokio::test]
    async fn test_now_playing_applies_limit_to_cached_listing() {
        let provider = unreachable_provider();
        let listing: Vec<CatalogMovie> = (1..=8)
            .map(|i| CatalogMovie {
                movie_id: MovieId(i),
                title: format!("Release {}", i),
            })
            .collect();
        provider.cache.set_in_background(
            &CacheKey::NowPlaying("en-US".to_string()),
            &listing,
            NOW_PLAYING_CACHE_TTL,
        );

        let movies = provider.now_playing(5).await.unwrap();
        assert_eq!(movies, listing[..5].to_vec());
    }
}
