use anyhow::Context;
use serde::{de::DeserializeOwned, Deserialize};
use std::{fs::File, io::BufReader, path::Path, time::Instant};

use super::{
    collaborative::CollaborativeStore,
    content::ContentStore,
    neighbors::{BruteForceIndex, DistanceMetric},
    sparse::SparseMatrix,
};
use crate::models::{CollaborativeEntry, ContentEntry, MovieId};

pub const CONTENT_CATALOG_FILE: &str = "content_catalog.json";
pub const CONTENT_SIMILARITY_FILE: &str = "content_similarity.json";
pub const COLLABORATIVE_CATALOG_FILE: &str = "collaborative_catalog.json";
pub const COLLABORATIVE_INDEX_FILE: &str = "collaborative_index.json";

/// On-disk layout of the collaborative neighbour structure
#[derive(Debug, Deserialize)]
pub struct CollaborativeIndexFile {
    #[serde(default)]
    pub metric: DistanceMetric,
    /// Movie identifier of each matrix row
    pub row_ids: Vec<MovieId>,
    pub matrix: SparseMatrix,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Loads the content catalog together with its similarity matrix
pub fn load_content(dir: &Path) -> anyhow::Result<ContentStore> {
    let start = Instant::now();
    let entries: Vec<ContentEntry> = read_json(&dir.join(CONTENT_CATALOG_FILE))?;
    let similarity: Vec<Vec<f32>> = read_json(&dir.join(CONTENT_SIMILARITY_FILE))?;

    let store = ContentStore::new(entries, similarity)
        .context("Content catalog and similarity matrix are inconsistent")?;

    tracing::info!(
        movies = store.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Loaded content artifacts"
    );

    Ok(store)
}

/// Loads the collaborative catalog, row index and rating matrix
pub fn load_collaborative(dir: &Path) -> anyhow::Result<CollaborativeStore> {
    let start = Instant::now();
    let entries: Vec<CollaborativeEntry> = read_json(&dir.join(COLLABORATIVE_CATALOG_FILE))?;
    let index_file: CollaborativeIndexFile = read_json(&dir.join(COLLABORATIVE_INDEX_FILE))?;

    index_file
        .matrix
        .validate()
        .context("Collaborative rating matrix is malformed")?;

    let rows = index_file.matrix.rows();
    let metric = index_file.metric;
    let index = BruteForceIndex::new(index_file.matrix, metric);
    let store = CollaborativeStore::new(entries, index_file.row_ids, Box::new(index))
        .context("Collaborative row index is inconsistent")?;

    tracing::info!(
        movies = store.len(),
        rows,
        metric = ?metric,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Loaded collaborative artifacts"
    );

    Ok(store)
}
