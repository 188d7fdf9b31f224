//! Entity vector spaces
//!
//! Holds the embedding table under evaluation: a dense row matrix with one
//! row per entity plus the vocabulary index from entity name to row.

use anyhow::Result;
use ndarray::{Array2, ArrayView1, Axis};
use std::collections::HashMap;

pub mod distance;

// Re-exports
pub use distance::*;

/// Represents an embedding vector
pub type Embedding = Vec<f32>;

/// Entity name to matrix row
pub type Vocabulary = HashMap<String, usize>;

/// In-memory vector space: entity names aligned with matrix rows
#[derive(Debug, Clone)]
pub struct VectorSpace {
    names: Vec<String>,
    vocab: Vocabulary,
    matrix: Array2<f32>,
}

impl VectorSpace {
    /// Build a vector space from names and a matrix with one row per name
    ///
    /// When a name occurs more than once the first row keeps the vocabulary
    /// entry; the later rows stay in the matrix but are unreachable by name.
    pub fn new(names: Vec<String>, matrix: Array2<f32>) -> Result<Self> {
        if names.len() != matrix.nrows() {
            anyhow::bail!(
                "Name count ({}) doesn't match vector count ({})",
                names.len(),
                matrix.nrows()
            );
        }

        let mut vocab = HashMap::with_capacity(names.len());
        for (row, name) in names.iter().enumerate() {
            if vocab.contains_key(name) {
                tracing::debug!("Duplicate entity {} at row {}, keeping first", name, row);
                continue;
            }
            vocab.insert(name.clone(), row);
        }

        Ok(Self {
            names,
            vocab,
            matrix,
        })
    }

    /// Build a vector space from (name, vector) rows of a fixed dimension
    pub fn from_rows(rows: Vec<(String, Embedding)>, dimension: usize) -> Result<Self> {
        let mut names = Vec::with_capacity(rows.len());
        let mut flat = Vec::with_capacity(rows.len() * dimension);

        for (name, vector) in rows {
            if vector.len() != dimension {
                anyhow::bail!(
                    "Vector for {} has dimension {}, expected {}",
                    name,
                    vector.len(),
                    dimension
                );
            }
            names.push(name);
            flat.extend(vector);
        }

        let matrix = Array2::from_shape_vec((names.len(), dimension), flat)?;
        Self::new(names, matrix)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Vector dimension
    pub fn dimension(&self) -> usize {
        self.matrix.ncols()
    }

    /// Entity names in row order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Case-sensitive lookup of an entity's row
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.vocab.get(name).copied()
    }

    pub fn vector(&self, row: usize) -> ArrayView1<'_, f32> {
        self.matrix.row(row)
    }

    pub fn matrix(&self) -> &Array2<f32> {
        &self.matrix
    }

    /// Gather the given rows into a new matrix
    pub fn select(&self, rows: &[usize]) -> Array2<f32> {
        self.matrix.select(Axis(0), rows)
    }

    /// Copy of this space with every row L2-normalized
    pub fn normalized(&self) -> Self {
        let mut matrix = self.matrix.clone();
        for mut row in matrix.rows_mut() {
            let norm = row.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                row.mapv_inplace(|v| v / norm);
            }
        }

        Self {
            names: self.names.clone(),
            vocab: self.vocab.clone(),
            matrix,
        }
    }
}
