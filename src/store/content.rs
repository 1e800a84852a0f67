use std::collections::HashMap;

use super::ArtifactError;
use crate::models::{CatalogMovie, ContentEntry};

/// Content catalog and its dense similarity matrix
///
/// The two are only ever built together: catalog position `i` is row and column `i`
/// of the matrix, so replacing one without the other is impossible.
pub struct ContentStore {
    entries: Vec<ContentEntry>,
    /// Row-major N×N scores
    scores: Vec<f32>,
    rows_by_title: HashMap<String, Vec<usize>>,
}

impl ContentStore {
    pub fn new(entries: Vec<ContentEntry>, similarity: Vec<Vec<f32>>) -> Result<Self, ArtifactError> {
        let n = entries.len();

        if similarity.len() != n {
            return Err(ArtifactError::Shape(format!(
                "similarity matrix has {} rows but the content catalog has {} entries",
                similarity.len(),
                n
            )));
        }

        let mut scores = Vec::with_capacity(n * n);
        for (i, row) in similarity.into_iter().enumerate() {
            if row.len() != n {
                return Err(ArtifactError::Shape(format!(
                    "similarity row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            if let Some(j) = row.iter().position(|s| !s.is_finite()) {
                return Err(ArtifactError::NonFinite {
                    what: "similarity matrix".to_string(),
                    position: i * n + j,
                });
            }
            scores.extend(row);
        }

        let mut rows_by_title: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            rows_by_title.entry(entry.title.clone()).or_default().push(i);
        }

        Ok(Self {
            entries,
            scores,
            rows_by_title,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First catalog row whose title matches exactly
    pub fn resolve_title(&self, title: &str) -> Option<usize> {
        self.rows_by_title
            .get(title)
            .and_then(|rows| rows.first())
            .copied()
    }

    pub fn entry(&self, row: usize) -> Option<&ContentEntry> {
        self.entries.get(row)
    }

    pub fn movie(&self, row: usize) -> Option<CatalogMovie> {
        self.entry(row).map(CatalogMovie::from)
    }

    /// Similarity scores of `row` against every catalog entry
    pub fn similarity_row(&self, row: usize) -> Option<&[f32]> {
        let n = self.len();
        (row < n).then(|| &self.scores[row * n..(row + 1) * n])
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.title.as_str())
    }

    /// Top `n` entries by popularity, equal popularity kept in catalog order
    pub fn most_popular(&self, n: usize) -> Vec<CatalogMovie> {
        let mut ranked: Vec<&ContentEntry> = self.entries.iter().collect();
        ranked.sort_by(|a, b| b.popularity.total_cmp(&a.popularity));
        ranked.into_iter().take(n).map(CatalogMovie::from).collect()
    }
}
