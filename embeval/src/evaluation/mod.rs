//! Evaluation tasks
//!
//! Every task pairs a task manager (alignment, persistence, error recovery)
//! with one or more scoring models:
//!
//! - `clustering` - ensemble clustering scored with seven external metrics
//! - `document_similarity` - entity-based document similarity vs. human scores
//! - `semantic_analogies` - top-k analogy completion accuracy
//!
//! Managers return a [`TaskOutcome`]; the runner merges outcomes into one
//! long-format score table.

use crate::embedding::VectorSpace;
use crate::error::EvalError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod clustering;
pub mod correlation;
pub mod document_similarity;
pub mod report;
pub mod semantic_analogies;

// Re-exports
pub use clustering::{ClusteringAlgorithm, ClusteringManager, ClusteringModel, ClusteringParams};
pub use document_similarity::{DocumentSimilarityManager, DocumentSimilarityModel};
pub use semantic_analogies::{SemanticAnalogiesManager, SemanticAnalogyModel};

/// Placeholder for models without a tunable configuration
pub const NO_CONFIGURATION: &str = "-";

/// The evaluation tasks this crate implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    Clustering,
    DocumentSimilarity,
    SemanticAnalogies,
}

impl TaskKind {
    /// All tasks, in the order they are run
    pub const ALL: [TaskKind; 3] = [
        TaskKind::Clustering,
        TaskKind::DocumentSimilarity,
        TaskKind::SemanticAnalogies,
    ];

    /// Task name as it appears in score tables and logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Clustering => "Clustering",
            Self::DocumentSimilarity => "DocumentSimilarity",
            Self::SemanticAnalogies => "SemanticAnalogies",
        }
    }

    /// Prefix of the files persisted for this task
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Self::Clustering => "clustering",
            Self::DocumentSimilarity => "documentSimilarity",
            Self::SemanticAnalogies => "semanticAnalogies",
        }
    }
}

impl std::str::FromStr for TaskKind {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|task| task.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = TaskKind::ALL.iter().map(TaskKind::name).collect();
                EvalError::config(format!(
                    "{} is not a supported task. The managed tasks are {} or '_all'",
                    s,
                    names.join(", ")
                ))
            })
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Scores of one model run on one gold-standard file
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub task: TaskKind,
    pub gold_standard_file: String,
    pub coverage: f64,
    pub model: String,
    pub model_configuration: Option<String>,
    /// Named scores; `None` marks a score that was not computable
    pub scores: Vec<(&'static str, Option<f64>)>,
}

impl MetricRecord {
    /// Look up a score by metric name
    pub fn score(&self, metric: &str) -> Option<f64> {
        self.scores
            .iter()
            .find(|(name, _)| *name == metric)
            .and_then(|(_, value)| *value)
    }

    /// Normalize into long format, one row per computable score
    pub fn score_rows(&self) -> Vec<ScoreTableRow> {
        self.scores
            .iter()
            .filter_map(|(metric, value)| {
                value.map(|score_value| ScoreTableRow {
                    task_name: self.task.name().to_string(),
                    gold_standard_file: self.gold_standard_file.clone(),
                    coverage: self.coverage,
                    model: self.model.clone(),
                    model_configuration: self
                        .model_configuration
                        .clone()
                        .unwrap_or_else(|| NO_CONFIGURATION.to_string()),
                    metric: metric.to_string(),
                    score_value,
                })
            })
            .collect()
    }
}

/// One row of the long-format score table shared by all tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreTableRow {
    pub task_name: String,
    pub gold_standard_file: String,
    pub coverage: f64,
    pub model: String,
    pub model_configuration: String,
    pub metric: String,
    pub score_value: f64,
}

/// Errors and notes a task recovered from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskLog {
    entries: Vec<String>,
}

impl TaskLog {
    /// Record a recovered error
    pub fn error(&mut self, task: TaskKind, error: &EvalError) {
        tracing::warn!("{}: {}", task, error);
        self.entries.push(format!("{}: {}", task, error));
    }

    /// Record an informational note
    pub fn note(&mut self, task: TaskKind, message: impl std::fmt::Display) {
        tracing::debug!("{}: {}", task, message);
        self.entries.push(format!("{}: {}", task, message));
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What a task manager hands back to the runner
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    pub task: TaskKind,
    pub scores: Vec<ScoreTableRow>,
    pub log: TaskLog,
}

impl TaskOutcome {
    pub fn new(task: TaskKind) -> Self {
        Self {
            task,
            scores: Vec::new(),
            log: TaskLog::default(),
        }
    }
}

/// Uniform contract of all task managers
///
/// `evaluate` never fails as a whole: per-file and per-model errors are
/// recovered and end up in the outcome's log.
pub trait TaskManager: Send + Sync {
    /// Which task this manager runs
    fn task(&self) -> TaskKind;

    /// Score `space` against the task's gold standards, persisting reports
    /// under `results_dir`
    fn evaluate(&self, space: &VectorSpace, results_dir: &Path) -> TaskOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_task_kind() {
        assert_eq!("Clustering".parse::<TaskKind>().unwrap(), TaskKind::Clustering);
        assert_eq!(
            "SemanticAnalogies".parse::<TaskKind>().unwrap(),
            TaskKind::SemanticAnalogies
        );

        let err = "Regression".parse::<TaskKind>().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("Regression is not a supported task"));
    }

    #[test]
    fn test_score_rows_skip_undefined_scores() {
        let record = MetricRecord {
            task: TaskKind::DocumentSimilarity,
            gold_standard_file: "LP50".to_string(),
            coverage: 0.75,
            model: "with_weights".to_string(),
            model_configuration: None,
            scores: vec![
                ("pearson_score", Some(0.5)),
                ("spearman_score", Some(-0.5)),
                ("harmonic_mean", None),
            ],
        };

        let rows = record.score_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].task_name, "DocumentSimilarity");
        assert_eq!(rows[0].model_configuration, NO_CONFIGURATION);
        assert_eq!(rows[1].metric, "spearman_score");
        assert_eq!(record.score("harmonic_mean"), None);
        assert_eq!(record.score("pearson_score"), Some(0.5));
    }

    #[test]
    fn test_task_log_collects_entries() {
        let mut log = TaskLog::default();
        log.error(
            TaskKind::Clustering,
            &EvalError::AlignmentEmpty {
                file: "teams_cluster".into(),
            },
        );
        log.note(TaskKind::Clustering, "done");

        assert_eq!(log.entries().len(), 2);
        assert!(log.entries()[0].starts_with("Clustering: "));
        assert!(log.entries()[0].contains("teams_cluster"));
    }
}
