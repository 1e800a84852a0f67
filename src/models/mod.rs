use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Stable movie identifier shared by the catalogs and the metadata provider
///
/// Never used as a matrix row directly; each store derives its own row positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(pub u64);

impl Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which precomputed structure answers a recommendation query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationMode {
    /// Item-item similarity over movie attributes
    Content,
    /// Nearest neighbours over user rating vectors
    Collaborative,
}

impl Display for RecommendationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendationMode::Content => write!(f, "content"),
            RecommendationMode::Collaborative => write!(f, "collaborative"),
        }
    }
}

/// Row of the content catalog; position in the catalog is the similarity matrix row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntry {
    #[serde(alias = "movieId")]
    pub movie_id: MovieId,
    pub title: String,
    #[serde(default)]
    pub popularity: f64,
}

/// Row of the collaborative catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaborativeEntry {
    #[serde(alias = "movieId")]
    pub movie_id: MovieId,
    pub title: String,
}

/// A movie resolved from a catalog position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMovie {
    pub movie_id: MovieId,
    pub title: String,
}

impl From<&ContentEntry> for CatalogMovie {
    fn from(entry: &ContentEntry) -> Self {
        Self {
            movie_id: entry.movie_id,
            title: entry.title.clone(),
        }
    }
}

pub const PLACEHOLDER_POSTER: &str = "https://via.placeholder.com/500";
pub const NOT_AVAILABLE: &str = "N/A";
pub const PLACEHOLDER_HOMEPAGE: &str = "#";

/// Display metadata for one movie
///
/// Always a valid record: fetch failures are represented by [`MovieDetails::placeholder`]
/// rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub poster: String,
    pub vote_average: String,
    pub release_year: String,
    pub genres: String,
    pub homepage: String,
}

impl MovieDetails {
    pub fn placeholder() -> Self {
        Self {
            poster: PLACEHOLDER_POSTER.to_string(),
            vote_average: NOT_AVAILABLE.to_string(),
            release_year: NOT_AVAILABLE.to_string(),
            genres: NOT_AVAILABLE.to_string(),
            homepage: PLACEHOLDER_HOMEPAGE.to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        *self == Self::placeholder()
    }
}

/// A ranked movie together with its display metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieCard {
    pub movie_id: MovieId,
    pub title: String,
    #[serde(flatten)]
    pub details: MovieDetails,
}

/// Now-playing panel payload
#[derive(Debug, Clone, Serialize)]
pub struct NowPlaying {
    pub movies: Vec<MovieCard>,
    pub fetched_at: DateTime<Utc>,
}

// ============================================================================
// TMDb API Types
// ============================================================================

/// Raw response from GET /movie/{id}
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieDetails {
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub homepage: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbGenre {
    pub name: String,
}

impl TmdbMovieDetails {
    /// Converts the raw payload into a display record, prefixing the poster path
    /// with `image_base_url`
    pub fn into_details(self, image_base_url: &str) -> MovieDetails {
        let poster = match self.poster_path.as_deref() {
            Some(path) if !path.is_empty() => format!("{}{}", image_base_url, path),
            _ => PLACEHOLDER_POSTER.to_string(),
        };

        let release_year = match self.release_date.as_deref() {
            Some(date) if !date.is_empty() => date.chars().take(4).collect(),
            _ => NOT_AVAILABLE.to_string(),
        };

        let genres = if self.genres.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            self.genres
                .iter()
                .map(|g| g.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };

        let homepage = match self.homepage {
            Some(url) if !url.is_empty() => url,
            _ => PLACEHOLDER_HOMEPAGE.to_string(),
        };

        MovieDetails {
            poster,
            vote_average: format!("{:.1}", self.vote_average.unwrap_or(0.0)),
            release_year,
            genres,
            homepage,
        }
    }
}

/// Raw response from GET /movie/now_playing
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbListing {
    #[serde(default)]
    pub results: Vec<TmdbListingEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbListingEntry {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
}

impl From<TmdbListingEntry> for CatalogMovie {
    fn from(entry: TmdbListingEntry) -> Self {
        CatalogMovie {
            movie_id: MovieId(entry.id),
            title: entry.title.unwrap_or_else(|| "Untitled".to_string()),
        }
    }
}
