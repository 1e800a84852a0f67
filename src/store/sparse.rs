use serde::{Deserialize, Serialize};

use super::ArtifactError;

/// Row-major compressed sparse matrix of per-movie rating vectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    pub n_cols: usize,
    pub indptr: Vec<usize>,
    pub indices: Vec<usize>,
    pub data: Vec<f32>,
}

/// Borrowed view of one matrix row; column indices are strictly increasing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseRow<'a> {
    pub indices: &'a [usize],
    pub values: &'a [f32],
}

impl SparseMatrix {
    /// Builds a matrix from dense rows, keeping non-zero cells only
    pub fn from_dense(rows: &[Vec<f32>]) -> Self {
        let n_cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();

        indptr.push(0);
        for row in rows {
            for (col, &value) in row.iter().enumerate() {
                if value != 0.0 {
                    indices.push(col);
                    data.push(value);
                }
            }
            indptr.push(indices.len());
        }

        Self {
            n_cols,
            indptr,
            indices,
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.indptr.len().saturating_sub(1)
    }

    pub fn row(&self, row: usize) -> Option<SparseRow<'_>> {
        if row >= self.rows() {
            return None;
        }
        let (start, end) = (self.indptr[row], self.indptr[row + 1]);
        Some(SparseRow {
            indices: &self.indices[start..end],
            values: &self.data[start..end],
        })
    }

    /// Checks the CSR layout invariants that row slicing relies on
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.indptr.is_empty() {
            return Err(ArtifactError::Shape("indptr must hold at least one offset".to_string()));
        }
        if self.indptr[0] != 0 {
            return Err(ArtifactError::Shape("indptr must start at 0".to_string()));
        }
        if self.indices.len() != self.data.len() {
            return Err(ArtifactError::Shape(format!(
                "indices ({}) and data ({}) lengths differ",
                self.indices.len(),
                self.data.len()
            )));
        }
        if self.indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(ArtifactError::Shape("indptr must be non-decreasing".to_string()));
        }
        if self.indptr.last().copied() != Some(self.data.len()) {
            return Err(ArtifactError::Shape(format!(
                "indptr ends at {:?} but {} values are stored",
                self.indptr.last(),
                self.data.len()
            )));
        }
        if let Some(pos) = self.data.iter().position(|v| !v.is_finite()) {
            return Err(ArtifactError::NonFinite {
                what: "rating matrix".to_string(),
                position: pos,
            });
        }

        for row in 0..self.rows() {
            let indices = &self.indices[self.indptr[row]..self.indptr[row + 1]];
            if indices.windows(2).any(|w| w[0] >= w[1]) {
                return Err(ArtifactError::Shape(format!(
                    "column indices of row {} are not strictly increasing",
                    row
                )));
            }
            if let Some(&col) = indices.iter().find(|&&c| c >= self.n_cols) {
                return Err(ArtifactError::Shape(format!(
                    "row {} references column {} but the matrix has {} columns",
                    row, col, self.n_cols
                )));
            }
        }

        Ok(())
    }
}

impl SparseRow<'_> {
    pub fn dot(&self, other: &SparseRow<'_>) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    pub fn squared_norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum()
    }

    pub fn max_column(&self) -> Option<usize> {
        self.indices.last().copied()
    }
}
