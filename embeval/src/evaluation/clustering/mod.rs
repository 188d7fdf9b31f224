//! Clustering evaluation
//!
//! Every gold-standard dataset lists entities with their true cluster label
//! and has a fixed expected cluster count. The aligned vectors are clustered
//! by an ensemble of four algorithms and each result is scored with seven
//! external metrics.

use crate::alignment::align;
use crate::data::read_cluster_labels;
use crate::embedding::{DistanceMetric, VectorSpace};
use crate::error::EvalError;
use crate::evaluation::report::{self, ResultRow};
use crate::evaluation::{MetricRecord, TaskKind, TaskLog, TaskManager, TaskOutcome, NO_CONFIGURATION};
use anyhow::Result;
use ndarray::ArrayView2;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub mod algorithms;
pub mod metrics;

pub use algorithms::Linkage;
pub use metrics::{compact_labels, ClusteringScores};

/// Datasets evaluated when no selection is configured
pub const DEFAULT_DATASETS: [&str; 2] = ["kgrc_person_object_place", "kgrc_qt900"];

/// Every dataset with a known cluster count
pub const AVAILABLE_DATASETS: [&str; 6] = [
    "citiesAndCountries_cluster",
    "cities2000AndCountries_cluster",
    "citiesMoviesAlbumsCompaniesUni_cluster",
    "teams_cluster",
    "kgrc_person_object_place",
    "kgrc_qt900",
];

/// Expected number of clusters of a gold-standard dataset
pub fn expected_cluster_count(dataset: &str) -> Option<usize> {
    match dataset {
        "citiesAndCountries_cluster" => Some(2),
        "cities2000AndCountries_cluster" => Some(2),
        "citiesMoviesAlbumsCompaniesUni_cluster" => Some(5),
        "teams_cluster" => Some(2),
        "kgrc_person_object_place" => Some(3),
        "kgrc_qt900" => Some(3),
        _ => None,
    }
}

/// Members of the clustering ensemble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusteringAlgorithm {
    /// DBSCAN
    Dbscan,
    /// K-means
    KMeans,
    /// Agglomerative, complete linkage
    Agglomerative,
    /// Agglomerative, Ward linkage
    WardHierarchical,
}

impl ClusteringAlgorithm {
    /// The ensemble, in evaluation order
    pub const ALL: [ClusteringAlgorithm; 4] = [
        ClusteringAlgorithm::Dbscan,
        ClusteringAlgorithm::KMeans,
        ClusteringAlgorithm::Agglomerative,
        ClusteringAlgorithm::WardHierarchical,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Dbscan => "DB",
            Self::KMeans => "KMeans",
            Self::Agglomerative => "AC",
            Self::WardHierarchical => "WHC",
        }
    }
}

impl std::str::FromStr for ClusteringAlgorithm {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClusteringAlgorithm::ALL
            .into_iter()
            .find(|algorithm| algorithm.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| EvalError::config(format!("Unknown clustering algorithm: {}", s)))
    }
}

impl std::fmt::Display for ClusteringAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Tuning shared by the ensemble
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringParams {
    /// Metric for DBSCAN and complete linkage (k-means and Ward are Euclidean)
    pub distance_metric: DistanceMetric,
    pub dbscan_eps: f64,
    pub dbscan_min_samples: usize,
    /// Number of k-means starts
    pub kmeans_n_init: usize,
    /// Seed for k-means++ starts
    pub seed: u64,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            distance_metric: DistanceMetric::Cosine,
            dbscan_eps: 0.5,
            dbscan_min_samples: 5,
            kmeans_n_init: 10,
            seed: 42,
        }
    }
}

impl ClusteringParams {
    pub fn with_distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.distance_metric = metric;
        self
    }

    pub fn with_dbscan(mut self, eps: f64, min_samples: usize) -> Self {
        self.dbscan_eps = eps;
        self.dbscan_min_samples = min_samples;
        self
    }

    pub fn with_kmeans(mut self, n_init: usize, seed: u64) -> Self {
        self.kmeans_n_init = n_init;
        self.seed = seed;
        self
    }
}

/// Predicted labelling of one clustering run
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    /// One label per input row; DBSCAN noise gets its own label
    pub labels: Vec<usize>,
    /// Clusters found (noise excluded)
    pub num_clusters: usize,
}

/// One ensemble member with its tuning
#[derive(Debug, Clone)]
pub struct ClusteringModel {
    algorithm: ClusteringAlgorithm,
    params: ClusteringParams,
}

impl ClusteringModel {
    pub fn new(algorithm: ClusteringAlgorithm, params: ClusteringParams) -> Self {
        Self { algorithm, params }
    }

    pub fn algorithm(&self) -> ClusteringAlgorithm {
        self.algorithm
    }

    /// Configuration label reported next to the model name
    pub fn configuration(&self) -> Option<String> {
        match self.algorithm {
            ClusteringAlgorithm::Dbscan => Some(format!(
                "eps={};min_samples={}",
                self.params.dbscan_eps, self.params.dbscan_min_samples
            )),
            ClusteringAlgorithm::KMeans => None,
            ClusteringAlgorithm::Agglomerative => Some("linkage=complete".to_string()),
            ClusteringAlgorithm::WardHierarchical => Some("linkage=ward".to_string()),
        }
    }

    /// Cluster `data` into (at most, for DBSCAN) `k` groups
    pub fn fit_predict(&self, data: ArrayView2<f32>, k: usize) -> Result<ClusterAssignment> {
        let params = &self.params;
        match self.algorithm {
            ClusteringAlgorithm::Dbscan => {
                let raw = algorithms::dbscan(
                    data,
                    params.dbscan_eps,
                    params.dbscan_min_samples,
                    params.distance_metric,
                )?;
                let num_clusters = raw.iter().flatten().max().map_or(0, |m| m + 1);
                let labels = raw.into_iter().map(|l| l.unwrap_or(num_clusters)).collect();
                Ok(ClusterAssignment {
                    labels,
                    num_clusters,
                })
            }
            ClusteringAlgorithm::KMeans => {
                let labels = algorithms::kmeans(data, k, params.kmeans_n_init, params.seed)?;
                Ok(ClusterAssignment { labels, num_clusters: k })
            }
            ClusteringAlgorithm::Agglomerative => {
                let labels =
                    algorithms::agglomerative(data, k, Linkage::Complete(params.distance_metric))?;
                Ok(ClusterAssignment { labels, num_clusters: k })
            }
            ClusteringAlgorithm::WardHierarchical => {
                let labels = algorithms::agglomerative(data, k, Linkage::Ward)?;
                Ok(ClusterAssignment { labels, num_clusters: k })
            }
        }
    }

    /// Cluster and score against the true labels
    pub fn train(
        &self,
        data: ArrayView2<f32>,
        labels_true: &[usize],
        k: usize,
    ) -> Result<(ClusterAssignment, ClusteringScores)> {
        let assignment = self.fit_predict(data, k)?;
        let scores = ClusteringScores::compute(labels_true, &assignment.labels)?;
        Ok((assignment, scores))
    }
}

/// Row of `clustering_<file>_results.csv`
#[derive(Debug, Clone, Serialize)]
pub struct ClusteringResultRow {
    pub task_name: String,
    pub gold_standard_file: String,
    pub coverage: f64,
    pub model_name: String,
    pub model_configuration: String,
    pub num_clusters: usize,
    pub adjusted_rand_index: f64,
    pub adjusted_mutual_info_score: f64,
    pub homogeneity_score: f64,
    pub completeness_score: f64,
    pub v_measure_score: f64,
    pub normalized_mutual_info_score: f64,
    pub clustering_accuracy: f64,
}

impl ResultRow for ClusteringResultRow {
    const HEADER: &'static [&'static str] = &[
        "task_name",
        "gold_standard_file",
        "coverage",
        "model_name",
        "model_configuration",
        "num_clusters",
        "adjusted_rand_index",
        "adjusted_mutual_info_score",
        "homogeneity_score",
        "completeness_score",
        "v_measure_score",
        "normalized_mutual_info_score",
        "clustering_accuracy",
    ];
}

/// Runs the clustering ensemble over the selected datasets
#[derive(Debug, Clone)]
pub struct ClusteringManager {
    gold_standard_dir: PathBuf,
    datasets: Vec<String>,
    params: ClusteringParams,
}

impl ClusteringManager {
    /// Manager over the default datasets, read from `<gold_standard_dir>/Clustering`
    pub fn new(gold_standard_dir: impl Into<PathBuf>, params: ClusteringParams) -> Self {
        Self {
            gold_standard_dir: gold_standard_dir.into(),
            datasets: DEFAULT_DATASETS.iter().map(|d| d.to_string()).collect(),
            params,
        }
    }

    pub fn with_datasets(mut self, datasets: Vec<String>) -> Self {
        self.datasets = datasets;
        self
    }

    pub fn datasets(&self) -> &[String] {
        &self.datasets
    }

    pub fn dataset_path(&self, dataset: &str) -> PathBuf {
        self.gold_standard_dir
            .join("Clustering")
            .join(format!("{}.tsv", dataset))
    }

    /// Evaluate every ensemble member on one dataset
    fn evaluate_dataset(
        &self,
        space: &VectorSpace,
        dataset: &str,
        results_dir: &Path,
        log: &mut TaskLog,
    ) -> Result<Vec<MetricRecord>, EvalError> {
        let task = TaskKind::Clustering;
        let k = expected_cluster_count(dataset)
            .ok_or_else(|| EvalError::config(format!("Unknown clustering dataset: {}", dataset)))?;

        let gold = read_cluster_labels(&self.dataset_path(dataset))
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
        let data = space.select(&aligned.matrix_rows());
        let true_names: Vec<&str> = aligned.rows.iter().map(|r| r.record.label.as_str()).collect();
        let labels_true = compact_labels(&true_names);

        tracing::info!(
            "{}: {} entities aligned (coverage {:.4}), k = {}",
            dataset,
            aligned.len(),
            coverage,
            k
        );

        let mut records = Vec::new();
        let mut result_rows = Vec::new();

        for algorithm in ClusteringAlgorithm::ALL {
            let model = ClusteringModel::new(algorithm, self.params.clone());
            match model.train(data.view(), &labels_true, k) {
                Ok((assignment, scores)) => {
                    tracing::debug!("{} on {}: {}", algorithm, dataset, scores);
                    let configuration = model.configuration();
                    result_rows.push(ClusteringResultRow {
                        task_name: task.name().to_string(),
                        gold_standard_file: dataset.to_string(),
                        coverage,
                        model_name: algorithm.name().to_string(),
                        model_configuration: configuration
                            .clone()
                            .unwrap_or_else(|| NO_CONFIGURATION.to_string()),
                        num_clusters: assignment.num_clusters,
                        adjusted_rand_index: scores.adjusted_rand_index,
                        adjusted_mutual_info_score: scores.adjusted_mutual_info_score,
                        homogeneity_score: scores.homogeneity_score,
                        completeness_score: scores.completeness_score,
                        v_measure_score: scores.v_measure_score,
                        normalized_mutual_info_score: scores.normalized_mutual_info_score,
                        clustering_accuracy: scores.clustering_accuracy,
                    });
                    records.push(MetricRecord {
                        task,
                        gold_standard_file: dataset.to_string(),
                        coverage,
                        model: algorithm.name().to_string(),
                        model_configuration: configuration,
                        scores: scores.named(),
                    });
                }
                Err(e) => log.error(task, &EvalError::model_failure(dataset, algorithm.name(), format!("{:#}", e))),
            }
        }

        if let Err(e) = report::store_results(results_dir, task, dataset, &result_rows) {
            log.note(task, format!("could not store results for {}: {:#}", dataset, e));
        }

        Ok(records)
    }
}

/// Per-algorithm mean over datasets, for algorithms scored on two or more
fn cross_dataset_records(per_dataset: &[Vec<MetricRecord>]) -> Vec<MetricRecord> {
    let mut combined = Vec::new();

    for algorithm in ClusteringAlgorithm::ALL {
        // first run of this algorithm on every dataset it succeeded on
        let runs: Vec<&MetricRecord> = per_dataset
            .iter()
            .filter_map(|records| records.iter().find(|r| r.model == algorithm.name()))
            .collect();
        if runs.len() < 2 {
            continue;
        }

        let count = runs.len() as f64;
        let coverage = runs.iter().map(|r| r.coverage).sum::<f64>() / count;
        let scores = ClusteringScores::NAMES
            .iter()
            .map(|&metric| {
                let values: Vec<f64> = runs.iter().filter_map(|r| r.score(metric)).collect();
                let mean = if values.is_empty() {
                    None
                } else {
                    Some(values.iter().sum::<f64>() / values.len() as f64)
                };
                (metric, mean)
            })
            .collect();

        combined.push(MetricRecord {
            task: TaskKind::Clustering,
            gold_standard_file: "all".to_string(),
            coverage,
            model: algorithm.name().to_string(),
            model_configuration: runs[0].model_configuration.clone(),
            scores,
        });
    }

    combined
}

impl TaskManager for ClusteringManager {
    fn task(&self) -> TaskKind {
        TaskKind::Clustering
    }

    fn evaluate(&self, space: &VectorSpace, results_dir: &Path) -> TaskOutcome {
        let mut outcome = TaskOutcome::new(self.task());
        let mut per_dataset = Vec::new();

        for dataset in &self.datasets {
            match self.evaluate_dataset(space, dataset, results_dir, &mut outcome.log) {
                Ok(records) => {
                    for record in &records {
                        outcome.scores.extend(record.score_rows());
                    }
                    per_dataset.push(records);
                }
                Err(e) => outcome.log.error(self.task(), &e),
            }
        }

        for record in cross_dataset_records(&per_dataset) {
            outcome.scores.extend(record.score_rows());
        }

        tracing::info!(
            "Clustering finished: {} score rows, {} log entries",
            outcome.scores.len(),
            outcome.log.entries().len()
        );
        outcome
    }
}
