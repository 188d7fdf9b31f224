//! Entity-based document similarity
//!
//! A document is the set of entities it mentions. Two documents are compared
//! by matching every entity of one with its most similar entity in the other,
//! in both directions, and averaging all those maxima.

use crate::alignment::AlignedRow;
use crate::data::{DocumentEntity, HumanScore};
use crate::embedding::{DistanceMetric, VectorSpace};
use crate::error::EvalError;
use crate::evaluation::correlation::{harmonic_mean, pearson, spearman};
use ndarray::Array2;
use std::collections::{HashMap, HashSet};

/// Entity of a document, resolved to its vector row
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedEntity {
    pub name: String,
    pub row: usize,
    pub weight: f64,
}

/// Entities of documents `1..=document_count`
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSet {
    documents: Vec<Vec<WeightedEntity>>,
}

impl DocumentSet {
    /// Group aligned entities by document
    ///
    /// Within a document, entities are ordered by weight (descending) and a
    /// repeated name keeps its highest-weight occurrence, the first one on
    /// equal weight. Document ids outside `1..=document_count` are dropped.
    pub fn new(entities: &[AlignedRow<DocumentEntity>], document_count: u32) -> Self {
        let mut documents: Vec<Vec<WeightedEntity>> = vec![Vec::new(); document_count as usize];

        for entity in entities {
            let doc = entity.record.doc;
            if doc == 0 || doc > document_count {
                tracing::debug!("Entity {} has document id {} out of range", entity.record.name, doc);
                continue;
            }
            documents[(doc - 1) as usize].push(WeightedEntity {
                name: entity.record.name.clone(),
                row: entity.row(),
                weight: entity.record.weight,
            });
        }

        for document in &mut documents {
            document.sort_by(|a, b| b.weight.total_cmp(&a.weight));
            let mut seen = HashSet::new();
            document.retain(|e| seen.insert(e.name.clone()));
        }

        Self { documents }
    }

    /// Entities of document `doc` (1-based); empty when out of range
    pub fn document(&self, doc: u32) -> &[WeightedEntity] {
        if doc == 0 {
            return &[];
        }
        self.documents
            .get((doc - 1) as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn document_count(&self) -> u32 {
        self.documents.len() as u32
    }

    /// Ids of documents without any aligned entity
    pub fn empty_documents(&self) -> Vec<u32> {
        (1..=self.document_count())
            .filter(|&doc| self.document(doc).is_empty())
            .collect()
    }
}

/// `(sum(left) + sum(right)) / (len(left) + len(right))`
pub fn aggregate_max_similarity(left: &[f64], right: &[f64]) -> f64 {
    let count = left.len() + right.len();
    if count == 0 {
        return 0.0;
    }
    (left.iter().sum::<f64>() + right.iter().sum::<f64>()) / count as f64
}

/// Correlations of one model run against the human judgments
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityScores {
    /// Document pairs present in both predictions and human scores
    pub pairs: usize,
    pub pearson: Option<f64>,
    pub spearman: Option<f64>,
    pub harmonic_mean: Option<f64>,
    /// Why a score is missing
    pub problems: Vec<EvalError>,
}

impl SimilarityScores {
    pub fn named(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("pearson_score", self.pearson),
            ("spearman_score", self.spearman),
            ("harmonic_mean", self.harmonic_mean),
        ]
    }
}

/// Document similarity model, with or without annotator weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentSimilarityModel {
    distance_metric: DistanceMetric,
    with_weights: bool,
}

impl DocumentSimilarityModel {
    pub fn new(distance_metric: DistanceMetric, with_weights: bool) -> Self {
        Self {
            distance_metric,
            with_weights,
        }
    }

    /// Label reported as the model name
    pub fn label(&self) -> &'static str {
        if self.with_weights {
            "with_weights"
        } else {
            "without_weights"
        }
    }

    pub fn uses_weights(&self) -> bool {
        self.with_weights
    }

    /// Similarity matrix from `left` entities to `right` entities
    fn similarity_matrix(&self, space: &VectorSpace, left: &[WeightedEntity], right: &[WeightedEntity]) -> Array2<f64> {
        let left_rows: Vec<usize> = left.iter().map(|e| e.row).collect();
        let right_rows: Vec<usize> = right.iter().map(|e| e.row).collect();
        let a = space.select(&left_rows);
        let b = space.select(&right_rows);

        let mut similarity = self.distance_metric.pairwise(a.view(), b.view()).mapv(|d| 1.0 - d);
        if self.with_weights {
            for ((i, j), value) in similarity.indexed_iter_mut() {
                *value *= left[i].weight * right[j].weight;
            }
        }
        similarity
    }

    /// Similarity of two non-empty documents
    pub fn document_similarity(&self, space: &VectorSpace, left: &[WeightedEntity], right: &[WeightedEntity]) -> f64 {
        let row_max = |matrix: &Array2<f64>| -> Vec<f64> {
            matrix
                .rows()
                .into_iter()
                .map(|row| row.iter().copied().fold(f64::NEG_INFINITY, f64::max))
                .collect()
        };

        let forward = row_max(&self.similarity_matrix(space, left, right));
        let backward = row_max(&self.similarity_matrix(space, right, left));
        aggregate_max_similarity(&forward, &backward)
    }

    /// Similarity of every pair `i <= j` of non-empty documents
    pub fn predict(&self, space: &VectorSpace, documents: &DocumentSet) -> HashMap<(u32, u32), f64> {
        let mut predictions = HashMap::new();
        let count = documents.document_count();

        for i in 1..=count {
            let left = documents.document(i);
            if left.is_empty() {
                continue;
            }
            for j in i..=count {
                let right = documents.document(j);
                if right.is_empty() {
                    continue;
                }
                predictions.insert((i, j), self.document_similarity(space, left, right));
            }
        }

        predictions
    }

    /// Correlate predicted similarities with the human judgments
    ///
    /// Pairs are joined regardless of order and each pair counts once. Fails
    /// with [`EvalError::NoData`] when no human-scored pair has a prediction;
    /// an undefined correlation only drops that score.
    pub fn train(
        &self,
        space: &VectorSpace,
        documents: &DocumentSet,
        human_scores: &[HumanScore],
    ) -> Result<SimilarityScores, EvalError> {
        let predictions = self.predict(space, documents);

        let mut predicted = Vec::new();
        let mut human = Vec::new();
        let mut joined = HashSet::new();
        for score in human_scores {
            let key = (score.doc1.min(score.doc2), score.doc1.max(score.doc2));
            if !joined.insert(key) {
                tracing::debug!("Human score for documents {:?} is listed twice, keeping the first", key);
                continue;
            }
            if let Some(&similarity) = predictions.get(&key) {
                predicted.push(similarity);
                human.push(score.average);
            }
        }

        if predicted.is_empty() {
            return Err(EvalError::NoData(format!(
                "{}: no human-scored document pair has a prediction",
                self.label()
            )));
        }

        let mut problems = Vec::new();
        let mut keep = |result: Result<f64, EvalError>| match result {
            Ok(value) => Some(value),
            Err(e) => {
                problems.push(e);
                None
            }
        };

        let pearson_score = keep(pearson(&predicted, &human));
        let spearman_score = keep(spearman(&predicted, &human));
        let harmonic = match (pearson_score, spearman_score) {
            (Some(p), Some(s)) => keep(harmonic_mean(p, s)),
            _ => None,
        };

        Ok(SimilarityScores {
            pairs: predicted.len(),
            pearson: pearson_score,
            spearman: spearman_score,
            harmonic_mean: harmonic,
            problems,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::align;

    fn space() -> VectorSpace {
        VectorSpace::from_rows(
            vec![
                ("a".to_string(), vec![1.0, 0.0]),
                ("b".to_string(), vec![0.0, 1.0]),
                ("c".to_string(), vec![0.6, 0.8]),
            ],
            2,
        )
        .unwrap()
    }

    fn entity(doc: u32, name: &str, weight: f64) -> DocumentEntity {
        DocumentEntity {
            doc,
            name: name.to_string(),
            weight,
        }
    }

    fn human(doc1: u32, doc2: u32, average: f64) -> HumanScore {
        HumanScore { doc1, doc2, average }
    }

    fn documents(entities: Vec<DocumentEntity>, count: u32) -> DocumentSet {
        let aligned = align(&space(), entities);
        DocumentSet::new(&aligned.rows, count)
    }

    #[test]
    fn test_aggregate_max_similarity() {
        let score = aggregate_max_similarity(&[0.9, 0.5], &[0.7]);
        assert!((score - 0.7).abs() < 1e-12);
        assert_eq!(aggregate_max_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_document_dedup_keeps_highest_weight() {
        let docs = documents(
            vec![entity(1, "a", 0.2), entity(1, "b", 0.5), entity(1, "a", 0.9), entity(2, "c", 1.0)],
            3,
        );

        let first = docs.document(1);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].name, "a");
        assert!((first[0].weight - 0.9).abs() < 1e-12);
        assert_eq!(docs.empty_documents(), vec![3]);
        assert!(docs.document(0).is_empty());
        assert!(docs.document(9).is_empty());
    }

    #[test]
    fn test_identical_documents_are_fully_similar() {
        let docs = documents(vec![entity(1, "a", 1.0), entity(2, "a", 1.0)], 2);
        let model = DocumentSimilarityModel::new(DistanceMetric::Cosine, false);
        let similarity = model.document_similarity(&space(), docs.document(1), docs.document(2));
        assert!((similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_weights_scale_similarity() {
        // cos(a, a) = 1, cos(a, c) = 0.6
        let docs = documents(
            vec![entity(1, "a", 0.5), entity(2, "a", 0.8), entity(2, "c", 0.4)],
            2,
        );
        let unweighted = DocumentSimilarityModel::new(DistanceMetric::Cosine, false);
        let weighted = DocumentSimilarityModel::new(DistanceMetric::Cosine, true);

        assert_eq!(weighted.label(), "with_weights");
        assert_eq!(unweighted.label(), "without_weights");

        // forward: max(1 * 0.5 * 0.8, 0.6 * 0.5 * 0.4) = 0.4
        // backward: 1 * 0.8 * 0.5 = 0.4 and 0.6 * 0.4 * 0.5 = 0.12
        let s = weighted.document_similarity(&space(), docs.document(1), docs.document(2));
        assert!((s - 0.92 / 3.0).abs() < 1e-6);
        let s = unweighted.document_similarity(&space(), docs.document(1), docs.document(2));
        assert!((s - 2.6 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_reversed_duplicate_pair_joins_once() {
        let docs = documents(vec![entity(1, "a", 1.0), entity(2, "a", 1.0), entity(3, "b", 1.0)], 3);
        let scores = vec![human(1, 2, 1.0), human(2, 1, 0.9), human(1, 3, 0.2), human(2, 3, 0.1)];
        let model = DocumentSimilarityModel::new(DistanceMetric::Cosine, false);

        let result = model.train(&space(), &docs, &scores).unwrap();
        assert_eq!(result.pairs, 3);
    }

    #[test]
    fn test_mixed_sign_correlations_drop_harmonic_mean() {
        // predictions 0, 0.6, 0.8, 1: pearson is about 0.30, spearman -0.2
        let docs = documents(
            vec![entity(1, "a", 1.0), entity(2, "b", 1.0), entity(3, "c", 1.0), entity(4, "a", 1.0)],
            4,
        );
        let scores = vec![human(1, 2, 0.2), human(1, 3, 0.3), human(2, 3, 5.0), human(1, 4, 0.1)];
        let model = DocumentSimilarityModel::new(DistanceMetric::Cosine, false);

        let result = model.train(&space(), &docs, &scores).unwrap();
        assert!(result.pearson.unwrap() > 0.2);
        assert!((result.spearman.unwrap() + 0.2).abs() < 1e-9);
        assert_eq!(result.harmonic_mean, None);
        assert_eq!(result.problems.len(), 1);
        assert!(matches!(result.problems[0], EvalError::DegenerateCorrelation(_)));
    }

    #[test]
    fn test_train_correlations() {
        let docs = documents(vec![entity(1, "a", 1.0), entity(2, "a", 1.0), entity(3, "b", 1.0)], 3);
        let scores = vec![human(1, 2, 1.0), human(1, 3, 0.2), human(3, 2, 0.1)];
        let model = DocumentSimilarityModel::new(DistanceMetric::Cosine, false);

        let result = model.train(&space(), &docs, &scores).unwrap();
        assert_eq!(result.pairs, 3);
        assert!(result.pearson.unwrap() > 0.99);
        assert!((result.spearman.unwrap() - 0.75f64.sqrt()).abs() < 1e-9);
        assert!(result.harmonic_mean.is_some());
        assert!(result.problems.is_empty());
    }

    #[test]
    fn test_constant_predictions_are_degenerate() {
        let docs = documents(vec![entity(1, "a", 1.0), entity(2, "a", 1.0), entity(3, "a", 1.0)], 3);
        let scores = vec![human(1, 2, 1.0), human(1, 3, 0.2), human(2, 3, 0.1)];
        let model = DocumentSimilarityModel::new(DistanceMetric::Cosine, false);

        let result = model.train(&space(), &docs, &scores).unwrap();
        assert_eq!(result.pearson, None);
        assert_eq!(result.spearman, None);
        assert_eq!(result.harmonic_mean, None);
        assert_eq!(result.problems.len(), 2);
        assert!(result
            .problems
            .iter()
            .all(|p| matches!(p, EvalError::DegenerateCorrelation(_))));
    }

    #[test]
    fn test_no_joined_pairs_is_no_data() {
        let docs = documents(vec![entity(1, "a", 1.0)], 3);
        let scores = vec![human(2, 3, 0.5)];
        let model = DocumentSimilarityModel::new(DistanceMetric::Cosine, true);

        let err = model.train(&space(), &docs, &scores).unwrap_err();
        assert!(matches!(err, EvalError::NoData(_)));
    }
}
