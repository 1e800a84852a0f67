use std::collections::HashMap;

use super::neighbors::NeighborIndex;
use super::ArtifactError;
use crate::models::{CollaborativeEntry, MovieId};

/// Collaborative catalog, row index and neighbour structure
///
/// Catalog order is unrelated to neighbour rows; `row_ids[r]` names the movie
/// stored at row `r`.
pub struct CollaborativeStore {
    entries: Vec<CollaborativeEntry>,
    ids_by_title: HashMap<String, Vec<MovieId>>,
    titles_by_id: HashMap<MovieId, usize>,
    row_ids: Vec<MovieId>,
    rows_by_id: HashMap<MovieId, usize>,
    index: Box<dyn NeighborIndex>,
}

impl CollaborativeStore {
    pub fn new(
        entries: Vec<CollaborativeEntry>,
        row_ids: Vec<MovieId>,
        index: Box<dyn NeighborIndex>,
    ) -> Result<Self, ArtifactError> {
        if row_ids.len() != index.rows() {
            return Err(ArtifactError::Shape(format!(
                "row index names {} movies but the rating matrix has {} rows",
                row_ids.len(),
                index.rows()
            )));
        }

        let mut rows_by_id = HashMap::with_capacity(row_ids.len());
        for (row, id) in row_ids.iter().enumerate() {
            if rows_by_id.insert(*id, row).is_some() {
                return Err(ArtifactError::DuplicateRow(*id));
            }
        }

        let mut ids_by_title: HashMap<String, Vec<MovieId>> = HashMap::new();
        let mut titles_by_id = HashMap::new();
        for (pos, entry) in entries.iter().enumerate() {
            ids_by_title
                .entry(entry.title.clone())
                .or_default()
                .push(entry.movie_id);
            titles_by_id.entry(entry.movie_id).or_insert(pos);
        }

        Ok(Self {
            entries,
            ids_by_title,
            titles_by_id,
            row_ids,
            rows_by_id,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identifier of the first catalog entry whose title matches exactly
    pub fn resolve_title(&self, title: &str) -> Option<MovieId> {
        self.ids_by_title
            .get(title)
            .and_then(|ids| ids.first())
            .copied()
    }

    /// Title of the first catalog entry carrying `movie_id`
    pub fn title_of(&self, movie_id: MovieId) -> Option<&str> {
        self.titles_by_id
            .get(&movie_id)
            .map(|&pos| self.entries[pos].title.as_str())
    }

    pub fn row_of(&self, movie_id: MovieId) -> Option<usize> {
        self.rows_by_id.get(&movie_id).copied()
    }

    pub fn movie_at_row(&self, row: usize) -> Option<MovieId> {
        self.row_ids.get(row).copied()
    }

    pub fn index(&self) -> &dyn NeighborIndex {
        self.index.as_ref()
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.title.as_str())
    }
}
