//! Precomputed recommendation data, loaded once at startup and read-only afterwards

use crate::models::MovieId;

pub mod artifacts;
pub mod collaborative;
pub mod content;
pub mod neighbors;
pub mod sparse;

pub use collaborative::CollaborativeStore;
pub use content::ContentStore;
pub use neighbors::{BruteForceIndex, DistanceMetric, Neighbor, NeighborIndex};
pub use sparse::{SparseMatrix, SparseRow};

/// Artifact consistency violations detected at load time
#[derive(thiserror::Error, Debug)]
pub enum ArtifactError {
    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("non-finite value in {what} at flat position {position}")]
    NonFinite { what: String, position: usize },

    #[error("movie {0} appears on more than one rating row")]
    DuplicateRow(MovieId),
}
