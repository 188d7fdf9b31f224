//! Alignment of a vector space with a gold standard
//!
//! Every entity a gold-standard row names is looked up (case-sensitively) in
//! the vector space. Rows whose entities are all present are kept together
//! with their matrix rows; the missing names are collected for reporting.

use crate::data::GoldStandardRow;
use crate::embedding::VectorSpace;
use std::collections::HashSet;

/// Gold-standard row joined with the vector-space rows of its entities
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow<R> {
    /// The gold-standard row, attributes untouched
    pub record: R,
    /// Matrix row of each entity, in [`GoldStandardRow::entity_names`] order
    pub rows: Vec<usize>,
}

impl<R> AlignedRow<R> {
    /// Matrix row of the first (for single-entity rows: the only) entity
    pub fn row(&self) -> usize {
        self.rows[0]
    }
}

/// Gold-standard entities absent from the vector space
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoredSet {
    /// Missing names, deduplicated, in first-seen order
    names: Vec<String>,
    /// Number of gold-standard rows dropped
    rows: usize,
}

impl IgnoredSet {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of gold-standard rows that were not aligned
    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

/// Result of intersecting a vector space with one gold-standard file
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedDataset<R> {
    pub rows: Vec<AlignedRow<R>>,
    pub ignored: IgnoredSet,
}

impl<R> AlignedDataset<R> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fraction of gold-standard rows found in the vector space
    pub fn coverage(&self) -> f64 {
        coverage(self.rows.len(), self.ignored.row_count())
    }

    /// Matrix rows of all aligned single-entity records
    pub fn matrix_rows(&self) -> Vec<usize> {
        self.rows.iter().map(AlignedRow::row).collect()
    }
}

/// `aligned / (aligned + ignored)`, 0 when there is no data at all
pub fn coverage(aligned: usize, ignored: usize) -> f64 {
    let total = aligned + ignored;
    if total == 0 {
        return 0.0;
    }
    aligned as f64 / total as f64
}

/// Intersect a vector space with a gold standard
///
/// Aligned rows keep the gold-standard order. The result depends only on the
/// inputs, so aligning twice yields the same partition.
pub fn align<R, I>(space: &VectorSpace, gold_standard: I) -> AlignedDataset<R>
where
    R: GoldStandardRow,
    I: IntoIterator<Item = R>,
{
    let mut rows = Vec::new();
    let mut ignored = IgnoredSet::default();
    let mut seen_missing: HashSet<String> = HashSet::new();

    for record in gold_standard {
        let mut indices = Vec::with_capacity(record.entity_names().len());
        let mut complete = true;

        for name in record.entity_names() {
            match space.index_of(name) {
                Some(row) => indices.push(row),
                None => {
                    complete = false;
                    if seen_missing.insert(name.clone()) {
                        ignored.names.push(name.clone());
                    }
                }
            }
        }

        if complete {
            rows.push(AlignedRow {
                record,
                rows: indices,
            });
        } else {
            ignored.rows += 1;
        }
    }

    tracing::debug!(
        "Aligned {} rows, ignored {} rows ({} distinct missing entities)",
        rows.len(),
        ignored.rows,
        ignored.names.len()
    );

    AlignedDataset { rows, ignored }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AnalogyQuadruple, ClusterLabel};

    fn space() -> VectorSpace {
        VectorSpace::from_rows(
            vec![
                ("x".to_string(), vec![1.0, 0.0]),
                ("y".to_string(), vec![0.0, 1.0]),
                ("z".to_string(), vec![1.0, 1.0]),
            ],
            2,
        )
        .unwrap()
    }

    fn label(name: &str, label: &str) -> ClusterLabel {
        ClusterLabel {
            name: name.to_string(),
            label: label.to_string(),
        }
    }

    #[test]
    fn test_partition_and_coverage() {
        let gold = vec![label("x", "0"), label("w", "1"), label("z", "0"), label("w", "1")];
        let aligned = align(&space(), gold);

        assert_eq!(aligned.len(), 2);
        assert_eq!(aligned.ignored.row_count(), 2);
        // reported names are deduplicated
        assert_eq!(aligned.ignored.names(), &["w".to_string()]);
        assert!((aligned.coverage() - 0.5).abs() < 1e-12);
        assert_eq!(aligned.matrix_rows(), vec![0, 2]);
        assert_eq!(aligned.rows[1].record.label, "0");
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let aligned = align(&space(), vec![label("X", "0")]);
        assert!(aligned.is_empty());
        assert_eq!(aligned.ignored.names(), &["X".to_string()]);
    }

    #[test]
    fn test_disjoint_gold_standard() {
        let gold = vec![label("a", "0"), label("b", "1"), label("c", "1")];
        let aligned = align(&space(), gold);

        assert_eq!(aligned.len(), 0);
        assert_eq!(aligned.ignored.row_count(), 3);
        assert_eq!(aligned.coverage(), 0.0);
    }

    #[test]
    fn test_empty_inputs_have_zero_coverage() {
        let aligned = align(&space(), Vec::<ClusterLabel>::new());
        assert_eq!(aligned.coverage(), 0.0);
        assert_eq!(coverage(0, 0), 0.0);
    }

    #[test]
    fn test_coverage_bounds() {
        for aligned in 0..5 {
            for ignored in 0..5 {
                let c = coverage(aligned, ignored);
                assert!((0.0..=1.0).contains(&c));
                if aligned + ignored > 0 {
                    assert!((c - aligned as f64 / (aligned + ignored) as f64).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_quadruple_needs_every_entity() {
        let gold = vec![
            AnalogyQuadruple::new("x", "y", "z", "x"),
            AnalogyQuadruple::new("x", "y", "q", "z"),
        ];
        let aligned = align(&space(), gold);

        assert_eq!(aligned.len(), 1);
        assert_eq!(aligned.rows[0].rows, vec![0, 1, 2, 0]);
        assert_eq!(aligned.ignored.names(), &["q".to_string()]);
    }

    #[test]
    fn test_alignment_is_deterministic() {
        let gold = vec![label("z", "0"), label("nope", "1"), label("x", "1")];
        let first = align(&space(), gold.clone());
        let second = align(&space(), gold);
        assert_eq!(first, second);
    }
}
