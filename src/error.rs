use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::{MovieId, RecommendationMode};

/// Failures of a single recommendation query
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RecommendError {
    #[error("'{title}' is not in the {mode} catalog")]
    TitleNotFound {
        title: String,
        mode: RecommendationMode,
    },

    #[error("'{title}' (movie {movie_id}) has no collaborative ratings row")]
    MissingRow { title: String, movie_id: MovieId },

    #[error("neighbor row {row} could not be resolved to a title: {reason}")]
    Resolution { row: usize, reason: String },

    #[error("neighbor lookup failed: {0}")]
    Neighbor(String),
}

impl RecommendError {
    /// Lookup misses the caller must surface as a definite failure
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RecommendError::TitleNotFound { .. } | RecommendError::MissingRow { .. }
        )
    }
}

/// Cache backend failures; callers treat these as a cache miss
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Metadata provider failures, recovered into a placeholder record for details lookups
#[derive(thiserror::Error, Debug)]
pub enum MetadataError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TMDb returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed TMDb response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Recommendation(#[from] RecommendError),

    #[error("External API error: {0}")]
    ExternalApi(#[from] MetadataError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Recommendation(e) if e.is_not_found() => (StatusCode::NOT_FOUND, e.to_string()),
            AppError::Recommendation(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::ExternalApi(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Request failed");
        }

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let missing_title = RecommendError::TitleNotFound {
            title: "Nope".to_string(),
            mode: RecommendationMode::Content,
        };
        let missing_row = RecommendError::MissingRow {
            title: "Heat".to_string(),
            movie_id: MovieId(6),
        };
        let neighbor = RecommendError::Neighbor("dimension mismatch".to_string());

        assert!(missing_title.is_not_found());
        assert!(missing_row.is_not_found());
        assert!(!neighbor.is_not_found());
    }

    #[test]
    fn test_error_messages() {
        let err = RecommendError::TitleNotFound {
            title: "Nope".to_string(),
            mode: RecommendationMode::Collaborative,
        };
        assert_eq!(err.to_string(), "'Nope' is not in the collaborative catalog");
    }

    #[test]
    fn test_status_mapping() {
        let not_found: AppError = RecommendError::TitleNotFound {
            title: "Nope".to_string(),
            mode: RecommendationMode::Content,
        }
        .into();
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let invalid = AppError::InvalidInput("title must not be empty".to_string());
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let upstream: AppError = MetadataError::Status {
            status: 401,
            body: "Invalid API key".to_string(),
        }
        .into();
        assert_eq!(upstream.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
