//! Semantic analogy evaluation
//!
//! Each dataset is a list of "a is to b as c is to d" quadruples; a
//! quadruple counts only when all four entities have vectors.

use crate::alignment::align;
use crate::data::{read_analogy_quadruples, AnalogyQuadruple};
use crate::embedding::VectorSpace;
use crate::error::EvalError;
use crate::evaluation::report::{self, ResultRow};
use crate::evaluation::{MetricRecord, TaskKind, TaskLog, TaskManager, TaskOutcome};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub mod model;

pub use model::{default_analogy_function, AnalogyFunction, AnalogyScores, SemanticAnalogyModel};

/// Analogy datasets, evaluated in this order
pub const DATASETS: [&str; 4] = [
    "capital_country_entities",
    "all_capital_country_entities",
    "currency_entities",
    "city_state_entities",
];

/// Model name used in the score table
pub const MODEL_NAME: &str = "TopK";

/// Row of `semanticAnalogies_<file>_results.csv`
#[derive(Debug, Clone, Serialize)]
pub struct SemanticAnalogyResultRow {
    pub task_name: String,
    pub gold_standard_file: String,
    pub coverage: f64,
    pub top_k_value: usize,
    pub right_answers: usize,
    pub tot_answers: usize,
    pub accuracy: Option<f64>,
}

impl ResultRow for SemanticAnalogyResultRow {
    const HEADER: &'static [&'static str] = &[
        "task_name",
        "gold_standard_file",
        "coverage",
        "top_k_value",
        "right_answers",
        "tot_answers",
        "accuracy",
    ];
}

/// Runs the analogy datasets with one top-k model
#[derive(Debug, Clone)]
pub struct SemanticAnalogiesManager {
    gold_standard_dir: PathBuf,
    model: SemanticAnalogyModel,
    datasets: Vec<String>,
}

impl SemanticAnalogiesManager {
    pub fn new(gold_standard_dir: impl Into<PathBuf>, top_k: usize) -> Self {
        Self {
            gold_standard_dir: gold_standard_dir.into(),
            model: SemanticAnalogyModel::new(top_k),
            datasets: DATASETS.iter().map(|d| d.to_string()).collect(),
        }
    }

    pub fn with_model(mut self, model: SemanticAnalogyModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_datasets(mut self, datasets: Vec<String>) -> Self {
        self.datasets = datasets;
        self
    }

    pub fn dataset_path(&self, dataset: &str) -> PathBuf {
        self.gold_standard_dir
            .join("SemanticAnalogies")
            .join(format!("{}.txt", dataset))
    }

    fn evaluate_dataset(
        &self,
        space: &VectorSpace,
        dataset: &str,
        results_dir: &Path,
        log: &mut TaskLog,
    ) -> Result<MetricRecord, EvalError> {
        let task = TaskKind::SemanticAnalogies;

        let gold = read_analogy_quadruples(&self.dataset_path(dataset))
            .map_err(|e| EvalError::gold_standard(dataset, &e))?;
        let aligned = align(space, gold);

        if let Err(e) = report::store_ignored(results_dir, task, dataset, &aligned.ignored) {
            log.note(task, format!("could not store ignored data for {}: {:#}", dataset, e));
        }
        if aligned.is_empty() {
            return Err(EvalError::AlignmentEmpty {
                file: dataset.to_string(),
            });
        }

        let coverage = aligned.coverage();
        let quadruples: Vec<AnalogyQuadruple> = aligned.rows.into_iter().map(|r| r.record).collect();
        let top_k = self.model.top_k();

        let scores = self
            .model
            .train(space.vocab(), &quadruples, space.matrix().view())
            .map_err(|e| EvalError::model_failure(dataset, MODEL_NAME, e))?;
        let accuracy = match scores.accuracy() {
            Ok(accuracy) => Some(accuracy),
            Err(e) => {
                log.error(task, &e);
                None
            }
        };

        tracing::info!(
            "{}: {}/{} right with top-{} (coverage {:.4})",
            dataset,
            scores.right_answers,
            scores.total_answers,
            top_k,
            coverage
        );

        let row = SemanticAnalogyResultRow {
            task_name: task.name().to_string(),
            gold_standard_file: dataset.to_string(),
            coverage,
            top_k_value: top_k,
            right_answers: scores.right_answers,
            tot_answers: scores.total_answers,
            accuracy,
        };
        if let Err(e) = report::store_results(results_dir, task, dataset, &[row]) {
            log.note(task, format!("could not store results for {}: {:#}", dataset, e));
        }

        Ok(MetricRecord {
            task,
            gold_standard_file: dataset.to_string(),
            coverage,
            model: MODEL_NAME.to_string(),
            model_configuration: Some(top_k.to_string()),
            scores: vec![("accuracy", accuracy)],
        })
    }
}

impl TaskManager for SemanticAnalogiesManager {
    fn task(&self) -> TaskKind {
        TaskKind::SemanticAnalogies
    }

    fn evaluate(&self, space: &VectorSpace, results_dir: &Path) -> TaskOutcome {
        let mut outcome = TaskOutcome::new(self.task());
        let normalized = space.normalized();

        for dataset in &self.datasets {
            match self.evaluate_dataset(&normalized, dataset, results_dir, &mut outcome.log) {
                Ok(record) => outcome.scores.extend(record.score_rows()),
                Err(e) => outcome.log.error(self.task(), &e),
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, ArrayView1};
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn space() -> VectorSpace {
        VectorSpace::from_rows(
            vec![
                ("Paris".to_string(), vec![1.0, 0.0, 1.0]),
                ("France".to_string(), vec![1.0, 0.0, 0.0]),
                ("Rome".to_string(), vec![0.0, 1.0, 1.0]),
                ("Italy".to_string(), vec![0.0, 1.0, 0.0]),
                ("Berlin".to_string(), vec![0.0, 0.0, 1.0]),
            ],
            3,
        )
        .unwrap()
    }

    fn write_dataset(dir: &Path, dataset: &str, content: &str) {
        let task_dir = dir.join("SemanticAnalogies");
        fs::create_dir_all(&task_dir).unwrap();
        fs::write(task_dir.join(format!("{}.txt", dataset)), content).unwrap();
    }

    #[test]
    fn test_evaluate_scores_and_reports() {
        let gold = tempdir().unwrap();
        let results = tempdir().unwrap();
        write_dataset(
            gold.path(),
            "capital_country_entities",
            "Paris France Rome Italy\nRome Italy Paris France\nParis France Madrid Spain\n",
        );

        let manager = SemanticAnalogiesManager::new(gold.path(), 1)
            .with_datasets(vec!["capital_country_entities".to_string()]);
        let outcome = manager.evaluate(&space(), results.path());

        assert!(outcome.log.is_empty(), "{:?}", outcome.log);
        assert_eq!(outcome.scores.len(), 1);
        let row = &outcome.scores[0];
        assert_eq!(row.model, MODEL_NAME);
        assert_eq!(row.model_configuration, "1");
        assert_eq!(row.metric, "accuracy");
        assert!((row.score_value - 1.0).abs() < 1e-12);
        assert!((row.coverage - 2.0 / 3.0).abs() < 1e-12);

        let csv = fs::read_to_string(
            results
                .path()
                .join("semanticAnalogies_capital_country_entities_results.csv"),
        )
        .unwrap();
        assert!(csv.starts_with("task_name,gold_standard_file,coverage,top_k_value,right_answers,tot_answers,accuracy\n"));
        assert!(csv.contains(",1,2,2,1"));

        let ignored = fs::read_to_string(
            results
                .path()
                .join("semanticAnalogies_capital_country_entities_ignoredData.txt"),
        )
        .unwrap();
        assert_eq!(ignored, "Madrid\nSpain\n");
    }

    #[test]
    fn test_missing_and_empty_datasets_are_logged() {
        let gold = tempdir().unwrap();
        let results = tempdir().unwrap();
        write_dataset(gold.path(), "currency_entities", "Euro Europe Dollar USA\n");

        let manager = SemanticAnalogiesManager::new(gold.path(), 2).with_datasets(vec![
            "currency_entities".to_string(),
            "city_state_entities".to_string(),
        ]);
        let outcome = manager.evaluate(&space(), results.path());

        assert!(outcome.scores.is_empty());
        assert_eq!(outcome.log.entries().len(), 2);
        assert!(outcome.log.entries()[0].contains("no entity is covered"));
        assert!(outcome.log.entries()[1].contains("city_state_entities"));
    }

    fn scalar(_: ArrayView1<f32>, _: ArrayView1<f32>, _: ArrayView1<f32>) -> Array1<f32> {
        Array1::zeros(1)
    }

    #[test]
    fn test_wrong_sized_prediction_is_a_model_failure() {
        let gold = tempdir().unwrap();
        let results = tempdir().unwrap();
        write_dataset(gold.path(), "capital_country_entities", "Paris France Rome Italy
");

        let model = SemanticAnalogyModel::new(1).with_analogy_function(Arc::new(scalar));
        let manager = SemanticAnalogiesManager::new(gold.path(), 1)
            .with_model(model)
            .with_datasets(vec![
                "capital_country_entities".to_string(),
                "currency_entities".to_string(),
            ]);
        let outcome = manager.evaluate(&space(), results.path());

        assert!(outcome.scores.is_empty());
        assert_eq!(outcome.log.entries().len(), 2);
        let failure = &outcome.log.entries()[0];
        assert!(failure.contains("capital_country_entities"));
        assert!(failure.contains(MODEL_NAME));
        assert!(failure.contains("1 components"));
        assert!(outcome.log.entries()[1].contains("currency_entities"));
    }
}
