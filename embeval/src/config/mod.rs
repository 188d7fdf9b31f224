//! Run configuration
//!
//! [`EvaluationSettings`] is the raw record as users write it (JSON file,
//! CLI flags). [`EvaluationSettings::validate`] turns it into the typed
//! [`EvaluationConfig`] the runner consumes; every problem found there is a
//! [`EvalError::ConfigurationInvalid`] and aborts the run before any task.

use crate::data::VectorFileFormat;
use crate::embedding::DistanceMetric;
use crate::error::EvalError;
use crate::evaluation::clustering::{self, ClusteringParams};
use crate::evaluation::TaskKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Task selector meaning "every task"
pub const ALL_TASKS: &str = "_all";

/// User-facing evaluation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    /// Vector file under evaluation
    pub vector_file: Option<PathBuf>,
    pub vector_file_format: String,
    pub vector_size: i64,
    /// Run tasks concurrently
    pub parallel: bool,
    /// Task names, or `"_all"`
    pub tasks: Vec<String>,
    pub distance_metric: String,
    /// k for the analogy task
    pub top_k: i64,
    pub debugging_mode: bool,
    /// Root holding `Clustering/`, `DocumentSimilarity/` and `SemanticAnalogies/`
    pub gold_standard_dir: PathBuf,
    /// Where reports go; a timestamped directory under `results/` otherwise
    pub result_directory: Option<PathBuf>,
    /// Clustering datasets to evaluate instead of the defaults
    pub clustering_datasets: Option<Vec<String>>,
    pub dbscan_eps: f64,
    pub dbscan_min_samples: usize,
    pub kmeans_n_init: usize,
    pub seed: u64,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        let clustering = ClusteringParams::default();
        Self {
            vector_file: None,
            vector_file_format: "txt".to_string(),
            vector_size: 200,
            parallel: false,
            tasks: vec![ALL_TASKS.to_string()],
            distance_metric: "cosine".to_string(),
            top_k: 2,
            debugging_mode: false,
            gold_standard_dir: PathBuf::from("data"),
            result_directory: None,
            clustering_datasets: None,
            dbscan_eps: clustering.dbscan_eps,
            dbscan_min_samples: clustering.dbscan_min_samples,
            kmeans_n_init: clustering.kmeans_n_init,
            seed: clustering.seed,
        }
    }
}

impl EvaluationSettings {
    pub fn new(vector_file: impl Into<PathBuf>) -> Self {
        Self {
            vector_file: Some(vector_file.into()),
            ..Default::default()
        }
    }

    /// Load settings from a JSON file; absent keys keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self, EvalError> {
        let content = fs::read_to_string(path)
            .map_err(|e| EvalError::config(format!("cannot read settings file {:?}: {}", path, e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, EvalError> {
        serde_json::from_str(content).map_err(|e| EvalError::config(format!("malformed settings: {}", e)))
    }

    pub fn with_tasks(mut self, tasks: &[&str]) -> Self {
        self.tasks = tasks.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_gold_standard_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.gold_standard_dir = dir.into();
        self
    }

    pub fn with_result_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.result_directory = Some(dir.into());
        self
    }

    /// Check every setting and build the typed configuration
    pub fn validate(&self) -> Result<EvaluationConfig, EvalError> {
        let vector_file = self
            .vector_file
            .clone()
            .ok_or_else(|| EvalError::config("no vector file given"))?;
        let vector_file_format: VectorFileFormat = self.vector_file_format.parse()?;

        if self.vector_size < 0 {
            return Err(EvalError::config(format!(
                "vector_size must not be negative, got {}",
                self.vector_size
            )));
        }
        if self.top_k < 0 {
            return Err(EvalError::config(format!("top_k must not be negative, got {}", self.top_k)));
        }

        let tasks = parse_tasks(&self.tasks)?;
        let distance_metric: DistanceMetric = self.distance_metric.parse()?;

        let clustering_datasets = match &self.clustering_datasets {
            Some(datasets) => {
                for dataset in datasets {
                    if clustering::expected_cluster_count(dataset).is_none() {
                        return Err(EvalError::config(format!(
                            "unknown clustering dataset: {}. Available: {}",
                            dataset,
                            clustering::AVAILABLE_DATASETS.join(", ")
                        )));
                    }
                }
                datasets.clone()
            }
            None => clustering::DEFAULT_DATASETS.iter().map(|d| d.to_string()).collect(),
        };

        if !(self.dbscan_eps > 0.0) {
            return Err(EvalError::config(format!("dbscan_eps must be positive, got {}", self.dbscan_eps)));
        }
        if self.dbscan_min_samples == 0 {
            return Err(EvalError::config("dbscan_min_samples must be at least 1"));
        }
        if self.kmeans_n_init == 0 {
            return Err(EvalError::config("kmeans_n_init must be at least 1"));
        }

        let clustering = ClusteringParams::default()
            .with_distance_metric(distance_metric)
            .with_dbscan(self.dbscan_eps, self.dbscan_min_samples)
            .with_kmeans(self.kmeans_n_init, self.seed);

        Ok(EvaluationConfig {
            vector_file,
            vector_file_format,
            vector_size: self.vector_size as usize,
            parallel: self.parallel,
            tasks,
            distance_metric,
            top_k: self.top_k as usize,
            debugging_mode: self.debugging_mode,
            gold_standard_dir: self.gold_standard_dir.clone(),
            result_directory: self.result_directory.clone(),
            clustering_datasets,
            clustering,
        })
    }
}

/// Expand `"_all"`, parse names, drop repeats (first occurrence wins)
fn parse_tasks(names: &[String]) -> Result<Vec<TaskKind>, EvalError> {
    if names.is_empty() {
        return Err(EvalError::config("no task selected"));
    }
    if names.iter().any(|name| name == ALL_TASKS) {
        return Ok(TaskKind::ALL.to_vec());
    }

    let mut tasks = Vec::new();
    for name in names {
        let task: TaskKind = name.parse()?;
        if !tasks.contains(&task) {
            tasks.push(task);
        }
    }
    Ok(tasks)
}

/// Validated configuration of one evaluation run
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationConfig {
    pub vector_file: PathBuf,
    pub vector_file_format: VectorFileFormat,
    pub vector_size: usize,
    pub parallel: bool,
    pub tasks: Vec<TaskKind>,
    pub distance_metric: DistanceMetric,
    pub top_k: usize,
    pub debugging_mode: bool,
    pub gold_standard_dir: PathBuf,
    pub result_directory: Option<PathBuf>,
    pub clustering_datasets: Vec<String>,
    pub clustering: ClusteringParams,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_validate() {
        let config = EvaluationSettings::new("vectors.txt").validate().unwrap();
        assert_eq!(config.vector_size, 200);
        assert_eq!(config.top_k, 2);
        assert_eq!(config.tasks, TaskKind::ALL.to_vec());
        assert_eq!(config.distance_metric, DistanceMetric::Cosine);
        assert_eq!(config.vector_file_format, VectorFileFormat::Txt);
        assert_eq!(config.clustering_datasets, vec!["kgrc_person_object_place", "kgrc_qt900"]);
        assert!(!config.parallel);
    }

    #[test]
    fn test_invalid_settings_are_configuration_errors() {
        let base = EvaluationSettings::new("vectors.txt");
        let cases = vec![
            EvaluationSettings { vector_size: -1, ..base.clone() },
            EvaluationSettings { top_k: -3, ..base.clone() },
            EvaluationSettings { vector_file_format: "hdf5".into(), ..base.clone() },
            EvaluationSettings { vector_file_format: "bin".into(), ..base.clone() },
            EvaluationSettings { distance_metric: "hamming".into(), ..base.clone() },
            EvaluationSettings { tasks: vec!["Regression".into()], ..base.clone() },
            EvaluationSettings { tasks: Vec::new(), ..base.clone() },
            EvaluationSettings { clustering_datasets: Some(vec!["nope".into()]), ..base.clone() },
            EvaluationSettings { dbscan_eps: 0.0, ..base.clone() },
            EvaluationSettings { kmeans_n_init: 0, ..base.clone() },
            EvaluationSettings { vector_file: None, ..base.clone() },
        ];

        for settings in cases {
            let err = settings.validate().unwrap_err();
            assert!(err.is_fatal(), "{:?}", settings);
        }
    }

    #[test]
    fn test_task_selection() {
        let config = EvaluationSettings::new("v.txt")
            .with_tasks(&["SemanticAnalogies", "Clustering", "SemanticAnalogies"])
            .validate()
            .unwrap();
        assert_eq!(config.tasks, vec![TaskKind::SemanticAnalogies, TaskKind::Clustering]);

        let config = EvaluationSettings::new("v.txt")
            .with_tasks(&["Clustering", "_all"])
            .validate()
            .unwrap();
        assert_eq!(config.tasks.len(), 3);
    }

    #[test]
    fn test_json_settings() {
        let settings = EvaluationSettings::from_json(
            r#"{"vector_file": "v.txt", "top_k": 5, "distance_metric": "euclidean", "parallel": true}"#,
        )
        .unwrap();
        let config = settings.validate().unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.distance_metric, DistanceMetric::Euclidean);
        assert_eq!(config.clustering.distance_metric, DistanceMetric::Euclidean);
        assert!(config.parallel);
        assert_eq!(config.vector_size, 200);
    }

    #[test]
    fn test_non_boolean_flag_is_rejected() {
        let err = EvaluationSettings::from_json(r#"{"parallel": "yes"}"#).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_settings_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"vector_file": "v.txt", "debugging_mode": true}"#).unwrap();

        let settings = EvaluationSettings::from_json_file(&path).unwrap();
        assert!(settings.debugging_mode);
        assert!(EvaluationSettings::from_json_file(&dir.path().join("missing.json")).is_err());
    }
}
