//! Top-k analogy completion
//!
//! For "a is to b as c is to d" the model builds a predicted vector from a, b
//! and c, ranks every row of the matrix by dot product with it and counts the
//! quadruple as answered when d is among the k best rows. The three query
//! rows themselves never count as candidates.

use crate::data::AnalogyQuadruple;
use crate::embedding::Vocabulary;
use crate::error::EvalError;
use ndarray::{Array1, ArrayView1, ArrayView2};
use rayon::prelude::*;
use std::sync::Arc;

/// Builds the predicted vector from the vectors of a, b and c
pub type AnalogyFunction =
    Arc<dyn Fn(ArrayView1<f32>, ArrayView1<f32>, ArrayView1<f32>) -> Array1<f32> + Send + Sync>;

/// `b - a + c`
pub fn offset_analogy(a: ArrayView1<f32>, b: ArrayView1<f32>, c: ArrayView1<f32>) -> Array1<f32> {
    &b - &a + &c
}

pub fn default_analogy_function() -> AnalogyFunction {
    Arc::new(offset_analogy)
}

/// Answer counts of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalogyScores {
    pub right_answers: usize,
    pub total_answers: usize,
}

impl AnalogyScores {
    /// `right / total`, undefined when nothing was attempted
    pub fn accuracy(&self) -> Result<f64, EvalError> {
        if self.total_answers == 0 {
            return Err(EvalError::NoData("no analogy quadruple to answer".to_string()));
        }
        Ok(self.right_answers as f64 / self.total_answers as f64)
    }
}

/// Analogy solver parameterized by k and the analogy function
#[derive(Clone)]
pub struct SemanticAnalogyModel {
    top_k: usize,
    analogy: AnalogyFunction,
}

impl std::fmt::Debug for SemanticAnalogyModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticAnalogyModel")
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

impl SemanticAnalogyModel {
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k,
            analogy: default_analogy_function(),
        }
    }

    pub fn with_analogy_function(mut self, analogy: AnalogyFunction) -> Self {
        self.analogy = analogy;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Best `k` rows for the query rows `a`, `b`, `c`, best first
    ///
    /// Equal scores rank the lower row first; `k` is clamped to the row count.
    /// Rows scoring NaN or infinity rank last, with the query rows.
    pub fn predict(
        &self,
        matrix: ArrayView2<f32>,
        a: usize,
        b: usize,
        c: usize,
    ) -> Result<Vec<usize>, EvalError> {
        let predicted = (self.analogy)(matrix.row(a), matrix.row(b), matrix.row(c));
        if predicted.len() != matrix.ncols() {
            return Err(EvalError::DimensionMismatch {
                expected: matrix.ncols(),
                found: predicted.len(),
            });
        }

        let mut scores = matrix.dot(&predicted);
        scores.mapv_inplace(|s| if s.is_finite() { s } else { f32::NEG_INFINITY });
        for excluded in [a, b, c] {
            scores[excluded] = f32::NEG_INFINITY;
        }

        let k = self.top_k.min(scores.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let rank = |i: &usize, j: &usize| scores[*j].total_cmp(&scores[*i]).then(i.cmp(j));
        let mut candidates: Vec<usize> = (0..scores.len()).collect();
        candidates.select_nth_unstable_by(k - 1, rank);
        candidates.truncate(k);
        candidates.sort_unstable_by(rank);
        Ok(candidates)
    }

    /// Answer every quadruple; any name missing from `vocab` fails the batch
    pub fn train(
        &self,
        vocab: &Vocabulary,
        quadruples: &[AnalogyQuadruple],
        matrix: ArrayView2<f32>,
    ) -> Result<AnalogyScores, EvalError> {
        let resolved = quadruples
            .iter()
            .map(|quadruple| -> Result<[usize; 4], EvalError> {
                let mut rows = [0usize; 4];
                for (slot, name) in rows.iter_mut().zip(quadruple.names()) {
                    *slot = *vocab
                        .get(name)
                        .ok_or_else(|| EvalError::OutOfVocabulary(name.clone()))?;
                }
                Ok(rows)
            })
            .collect::<Result<Vec<[usize; 4]>, EvalError>>()?;

        let right_answers = resolved
            .par_iter()
            .map(|[a, b, c, d]| self.predict(matrix, *a, *b, *c).map(|top| top.contains(d)))
            .collect::<Result<Vec<bool>, EvalError>>()?
            .into_iter()
            .filter(|&right| right)
            .count();

        Ok(AnalogyScores {
            right_answers,
            total_answers: resolved.len(),
        })
    }
}
