//! Document similarity evaluation on the LP50 corpus
//!
//! Predicted document similarities are correlated with averaged human
//! judgments, once without and once with the annotators' entity weights.

use crate::alignment::align;
use crate::data::{read_document_entities, read_human_scores};
use crate::embedding::{DistanceMetric, VectorSpace};
use crate::error::EvalError;
use crate::evaluation::report::{self, ResultRow};
use crate::evaluation::{MetricRecord, TaskKind, TaskManager, TaskOutcome};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub mod model;

pub use model::{aggregate_max_similarity, DocumentSet, DocumentSimilarityModel, SimilarityScores};

/// Gold-standard id used in reports
pub const GOLD_STANDARD_FILE: &str = "LP50";

/// Number of documents in the corpus
pub const DOCUMENT_COUNT: u32 = 50;

/// Row of `documentSimilarity_LP50_results.csv`
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSimilarityResultRow {
    pub task_name: String,
    pub gold_standard_file: String,
    pub coverage: f64,
    pub conf: String,
    pub pearson_score: Option<f64>,
    pub spearman_score: Option<f64>,
    pub harmonic_mean: Option<f64>,
}

impl ResultRow for DocumentSimilarityResultRow {
    const HEADER: &'static [&'static str] = &[
        "task_name",
        "gold_standard_file",
        "coverage",
        "conf",
        "pearson_score",
        "spearman_score",
        "harmonic_mean",
    ];
}

/// Runs the document similarity task
#[derive(Debug, Clone)]
pub struct DocumentSimilarityManager {
    gold_standard_dir: PathBuf,
    distance_metric: DistanceMetric,
}

impl DocumentSimilarityManager {
    pub fn new(gold_standard_dir: impl Into<PathBuf>, distance_metric: DistanceMetric) -> Self {
        Self {
            gold_standard_dir: gold_standard_dir.into(),
            distance_metric,
        }
    }

    pub fn entities_path(&self) -> PathBuf {
        self.task_dir().join(format!("{}_entities.json", GOLD_STANDARD_FILE))
    }

    pub fn scores_path(&self) -> PathBuf {
        self.task_dir().join(format!("{}_averageScores.csv", GOLD_STANDARD_FILE))
    }

    fn task_dir(&self) -> PathBuf {
        self.gold_standard_dir.join("DocumentSimilarity")
    }
}

impl TaskManager for DocumentSimilarityManager {
    fn task(&self) -> TaskKind {
        TaskKind::DocumentSimilarity
    }

    fn evaluate(&self, space: &VectorSpace, results_dir: &Path) -> TaskOutcome {
        let task = self.task();
        let mut outcome = TaskOutcome::new(task);

        let entities = match read_document_entities(&self.entities_path()) {
            Ok(entities) => entities,
            Err(e) => {
                outcome.log.error(task, &EvalError::gold_standard(GOLD_STANDARD_FILE, &e));
                return outcome;
            }
        };
        let human_scores = match read_human_scores(&self.scores_path()) {
            Ok(scores) => scores,
            Err(e) => {
                outcome.log.error(task, &EvalError::gold_standard(GOLD_STANDARD_FILE, &e));
                return outcome;
            }
        };

        let normalized = space.normalized();
        let aligned = align(&normalized, entities);

        if let Err(e) = report::store_ignored(results_dir, task, GOLD_STANDARD_FILE, &aligned.ignored) {
            outcome.log.note(task, format!("could not store ignored data: {:#}", e));
        }
        if aligned.is_empty() {
            outcome.log.error(
                task,
                &EvalError::AlignmentEmpty {
                    file: GOLD_STANDARD_FILE.to_string(),
                },
            );
            return outcome;
        }

        let coverage = aligned.coverage();
        let documents = DocumentSet::new(&aligned.rows, DOCUMENT_COUNT);
        for doc in documents.empty_documents() {
            outcome
                .log
                .note(task, format!("document {} has no covered entity, its pairs are skipped", doc));
        }

        let mut result_rows = Vec::new();
        for with_weights in [false, true] {
            let model = DocumentSimilarityModel::new(self.distance_metric, with_weights);
            tracing::info!(
                "Document similarity ({}), weights enabled: {}",
                model.label(),
                model.uses_weights()
            );

            let scores = match model.train(&normalized, &documents, &human_scores) {
                Ok(scores) => scores,
                Err(e) => {
                    outcome.log.error(task, &e);
                    SimilarityScores {
                        pairs: 0,
                        pearson: None,
                        spearman: None,
                        harmonic_mean: None,
                        problems: Vec::new(),
                    }
                }
            };
            for problem in &scores.problems {
                outcome.log.error(task, problem);
            }

            tracing::debug!(
                "{}: {} pairs, pearson {:?}, spearman {:?}",
                model.label(),
                scores.pairs,
                scores.pearson,
                scores.spearman
            );

            result_rows.push(DocumentSimilarityResultRow {
                task_name: task.name().to_string(),
                gold_standard_file: GOLD_STANDARD_FILE.to_string(),
                coverage,
                conf: model.label().to_string(),
                pearson_score: scores.pearson,
                spearman_score: scores.spearman,
                harmonic_mean: scores.harmonic_mean,
            });

            let record = MetricRecord {
                task,
                gold_standard_file: GOLD_STANDARD_FILE.to_string(),
                coverage,
                model: model.label().to_string(),
                model_configuration: None,
                scores: scores.named(),
            };
            outcome.scores.extend(record.score_rows());
        }

        if let Err(e) = report::store_results(results_dir, task, GOLD_STANDARD_FILE, &result_rows) {
            outcome.log.note(task, format!("could not store results: {:#}", e));
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn space() -> VectorSpace {
        VectorSpace::from_rows(
            vec![
                ("a".to_string(), vec![2.0, 0.0]),
                ("b".to_string(), vec![0.0, 3.0]),
                ("c".to_string(), vec![1.0, 1.0]),
            ],
            2,
        )
        .unwrap()
    }

    fn write_gold(dir: &Path, entities: &str, scores: &str) {
        let task_dir = dir.join("DocumentSimilarity");
        fs::create_dir_all(&task_dir).unwrap();
        fs::write(task_dir.join("LP50_entities.json"), entities).unwrap();
        fs::write(task_dir.join("LP50_averageScores.csv"), scores).unwrap();
    }

    #[test]
    fn test_evaluate_writes_both_configurations() {
        let gold = tempdir().unwrap();
        let results = tempdir().unwrap();
        write_gold(
            gold.path(),
            r#"[
                {"doc": 1, "name": "a", "weight": 1.0},
                {"doc": 2, "name": "a", "weight": 0.5},
                {"doc": 2, "name": "c", "weight": 0.5},
                {"doc": 3, "name": "b", "weight": 1.0},
                {"doc": 3, "name": "zz", "weight": 1.0}
            ]"#,
            "doc1,doc2,average\n1,2,4.0\n1,3,1.0\n2,3,2.5\n",
        );

        let manager = DocumentSimilarityManager::new(gold.path(), DistanceMetric::Cosine);
        let outcome = manager.evaluate(&space(), results.path());

        let models: Vec<&str> = outcome.scores.iter().map(|r| r.model.as_str()).collect();
        assert!(models.contains(&"without_weights"));
        assert!(models.contains(&"with_weights"));
        assert!(outcome.scores.iter().all(|r| (r.coverage - 0.8).abs() < 1e-12));
        assert!(outcome.scores.iter().all(|r| r.model_configuration == "-"));

        let csv = fs::read_to_string(results.path().join("documentSimilarity_LP50_results.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
        let ignored = fs::read_to_string(results.path().join("documentSimilarity_LP50_ignoredData.txt")).unwrap();
        assert_eq!(ignored, "zz\n");
    }

    #[test]
    fn test_mixed_sign_correlations_are_logged_not_scored() {
        let gold = tempdir().unwrap();
        let results = tempdir().unwrap();
        // similarities 0, 0.6, 0.8, 1 against human scores of opposite rank order
        write_gold(
            gold.path(),
            r#"[
                {"doc": 1, "name": "a", "weight": 1.0},
                {"doc": 2, "name": "b", "weight": 1.0},
                {"doc": 3, "name": "c", "weight": 1.0},
                {"doc": 4, "name": "a", "weight": 1.0}
            ]"#,
            "doc1,doc2,average\n1,2,0.2\n1,3,0.3\n2,3,5.0\n1,4,0.1\n",
        );
        let space = VectorSpace::from_rows(
            vec![
                ("a".to_string(), vec![1.0, 0.0]),
                ("b".to_string(), vec![0.0, 1.0]),
                ("c".to_string(), vec![0.6, 0.8]),
            ],
            2,
        )
        .unwrap();

        let manager = DocumentSimilarityManager::new(gold.path(), DistanceMetric::Cosine);
        let outcome = manager.evaluate(&space, results.path());

        assert_eq!(outcome.scores.len(), 4);
        assert!(outcome.scores.iter().all(|r| r.metric != "harmonic_mean"));
        let degenerate = outcome
            .log
            .entries()
            .iter()
            .filter(|e| e.contains("harmonic mean undefined"))
            .count();
        assert_eq!(degenerate, 2);

        let csv = fs::read_to_string(results.path().join("documentSimilarity_LP50_results.csv")).unwrap();
        assert!(csv.lines().skip(1).all(|line| line.ends_with(',')));
    }

    #[test]
    fn test_missing_gold_standard_is_logged() {
        let gold = tempdir().unwrap();
        let results = tempdir().unwrap();

        let manager = DocumentSimilarityManager::new(gold.path(), DistanceMetric::Cosine);
        let outcome = manager.evaluate(&space(), results.path());

        assert!(outcome.scores.is_empty());
        assert_eq!(outcome.log.entries().len(), 1);
        assert!(outcome.log.entries()[0].contains("LP50"));
    }

    #[test]
    fn test_non_overlapping_entities() {
        let gold = tempdir().unwrap();
        let results = tempdir().unwrap();
        write_gold(
            gold.path(),
            r#"[{"doc": 1, "name": "q", "weight": 1.0}]"#,
            "doc1,doc2,average\n1,2,4.0\n",
        );

        let manager = DocumentSimilarityManager::new(gold.path(), DistanceMetric::Cosine);
        let outcome = manager.evaluate(&space(), results.path());

        assert!(outcome.scores.is_empty());
        assert!(outcome.log.entries()[0].contains("no entity is covered"));
    }
}
