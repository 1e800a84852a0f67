use serde::{Deserialize, Serialize};

use super::sparse::{SparseMatrix, SparseRow};
use crate::error::RecommendError;

/// Distance used when ranking rating vectors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
}

/// One result of a nearest-neighbour query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f32,
}

/// Rating rows plus a k-nearest-neighbour query over them
pub trait NeighborIndex: Send + Sync {
    fn rows(&self) -> usize;

    fn row(&self, row: usize) -> Option<SparseRow<'_>>;

    /// Returns up to `k` rows ordered by distance to `query`, ties broken by row order
    fn k_nearest(&self, query: &SparseRow<'_>, k: usize) -> Result<Vec<Neighbor>, RecommendError>;
}

/// Exact kNN that scores every stored row
pub struct BruteForceIndex {
    matrix: SparseMatrix,
    metric: DistanceMetric,
    squared_norms: Vec<f32>,
}

impl BruteForceIndex {
    pub fn new(matrix: SparseMatrix, metric: DistanceMetric) -> Self {
        let squared_norms = (0..matrix.rows())
            .filter_map(|r| matrix.row(r))
            .map(|row| row.squared_norm())
            .collect();

        Self {
            matrix,
            metric,
            squared_norms,
        }
    }

    fn distance(&self, query: &SparseRow<'_>, query_sq: f32, row: usize) -> f32 {
        let Some(candidate) = self.matrix.row(row) else {
            return f32::INFINITY;
        };
        let candidate_sq = self.squared_norms[row];
        let dot = query.dot(&candidate);

        match self.metric {
            DistanceMetric::Cosine => {
                if query_sq == 0.0 || candidate_sq == 0.0 {
                    return 1.0;
                }
                (1.0 - dot / (query_sq.sqrt() * candidate_sq.sqrt())).max(0.0)
            }
            DistanceMetric::Euclidean => (query_sq + candidate_sq - 2.0 * dot).max(0.0).sqrt(),
        }
    }
}

impl NeighborIndex for BruteForceIndex {
    fn rows(&self) -> usize {
        self.matrix.rows()
    }

    fn row(&self, row: usize) -> Option<SparseRow<'_>> {
        self.matrix.row(row)
    }

    fn k_nearest(&self, query: &SparseRow<'_>, k: usize) -> Result<Vec<Neighbor>, RecommendError> {
        if query.indices.len() != query.values.len() {
            return Err(RecommendError::Neighbor(
                "query vector indices and values differ in length".to_string(),
            ));
        }
        if let Some(col) = query.max_column().filter(|&c| c >= self.matrix.n_cols) {
            return Err(RecommendError::Neighbor(format!(
                "query references column {} but the index has {} columns",
                col, self.matrix.n_cols
            )));
        }

        let query_sq = query.squared_norm();
        let mut neighbors: Vec<Neighbor> = (0..self.rows())
            .map(|row| Neighbor {
                row,
                distance: self.distance(query, query_sq, row),
            })
            .collect();

        // Stable sort keeps row order for equal distances
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k);

        Ok(neighbors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(rows: &[Vec<f32>], metric: DistanceMetric) -> BruteForceIndex {
        BruteForceIndex::new(SparseMatrix::from_dense(rows), metric)
    }

    #[test]
    fn test_cosine_query_row_is_its_own_nearest() {
        let idx = index(
            &[
                vec![5.0, 4.0, 0.0, 0.0],
                vec![4.0, 5.0, 0.0, 1.0],
                vec![0.0, 0.0, 5.0, 4.0],
            ],
            DistanceMetric::Cosine,
        );

        let query = idx.row(0).unwrap();
        let result = idx.k_nearest(&query, 3).unwrap();

        assert_eq!(result.iter().map(|n| n.row).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(result[0].distance.abs() < 1e-6);
        assert_eq!(result[2].distance, 1.0);
    }

    #[test]
    fn test_k_truncates() {
        let idx = index(&[vec![1.0], vec![2.0], vec![3.0]], DistanceMetric::Euclidean);
        let query = idx.row(2).unwrap();
        let result = idx.k_nearest(&query, 2).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].row, 2);
        assert_eq!(result[1].row, 1);
        assert!((result[1].distance - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_equal_distances_keep_row_order() {
        let idx = index(
            &[vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 1.0], vec![1.0, 0.0]],
            DistanceMetric::Euclidean,
        );
        let query = idx.row(1).unwrap();
        let result = idx.k_nearest(&query, 4).unwrap();

        assert_eq!(result.iter().map(|n| n.row).collect::<Vec<_>>(), vec![1, 2, 0, 3]);
    }

    #[test]
    fn test_zero_vector_is_maximally_distant_under_cosine() {
        let idx = index(&[vec![1.0, 1.0], vec![0.0, 0.0]], DistanceMetric::Cosine);
        let query = idx.row(0).unwrap();
        let result = idx.k_nearest(&query, 2).unwrap();

        assert_eq!(result[1].row, 1);
        assert_eq!(result[1].distance, 1.0);
    }

    #[test]
    fn test_query_outside_dimension_fails() {
        let idx = index(&[vec![1.0, 1.0]], DistanceMetric::Cosine);
        let indices = [5usize];
        let values = [1.0f32];
        let query = SparseRow {
            indices: &indices,
            values: &values,
        };

        assert!(matches!(
            idx.k_nearest(&query, 1),
            Err(RecommendError::Neighbor(_))
        ));
    }

    #[test]
    fn test_metric_deserialization() {
        let metric: DistanceMetric = serde_json::from_str("\"euclidean\"").unwrap();
        assert_eq!(metric, DistanceMetric::Euclidean);
    }
}
