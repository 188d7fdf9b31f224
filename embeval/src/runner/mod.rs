//! Evaluation runner
//!
//! Loads the vector file once, hands the read-only vector space to every
//! selected task manager (on the rayon pool when `parallel` is set) and
//! merges the returned fragments into `scores.csv` and `log.txt`.

use crate::config::EvaluationConfig;
use crate::data::load_vectors;
use crate::embedding::VectorSpace;
use crate::evaluation::report::{write_log_report, write_score_table};
use crate::evaluation::{
    ClusteringManager, DocumentSimilarityManager, ScoreTableRow, SemanticAnalogiesManager, TaskKind,
    TaskLog, TaskManager, TaskOutcome,
};
use crate::utils::create_result_directory;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// File name of the merged score table
pub const SCORE_TABLE_FILE: &str = "scores.csv";

/// File name of the log report
pub const LOG_REPORT_FILE: &str = "log.txt";

/// Merged result of one run
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub results_dir: PathBuf,
    pub scores: Vec<ScoreTableRow>,
    pub logs: Vec<(TaskKind, TaskLog)>,
}

impl EvaluationReport {
    pub fn score_table_path(&self) -> PathBuf {
        self.results_dir.join(SCORE_TABLE_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.results_dir.join(LOG_REPORT_FILE)
    }

    /// Recovered problems over all tasks
    pub fn problem_count(&self) -> usize {
        self.logs.iter().map(|(_, log)| log.entries().len()).sum()
    }
}

impl std::fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Evaluation Report:")?;
        writeln!(f, "  Results directory: {}", self.results_dir.display())?;
        for (task, log) in &self.logs {
            let rows = self.scores.iter().filter(|r| r.task_name == task.name()).count();
            writeln!(f, "  {}: {} scores, {} logged problems", task, rows, log.entries().len())?;
        }
        write!(f, "  Total scores: {}", self.scores.len())
    }
}

/// Runs the configured tasks against one vector file
pub struct EvaluationRunner {
    config: EvaluationConfig,
}

impl EvaluationRunner {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// One manager per selected task, in configuration order
    pub fn managers(&self) -> Vec<Box<dyn TaskManager>> {
        let config = &self.config;
        config
            .tasks
            .iter()
            .map(|task| -> Box<dyn TaskManager> {
                match task {
                    TaskKind::Clustering => Box::new(
                        ClusteringManager::new(&config.gold_standard_dir, config.clustering.clone())
                            .with_datasets(config.clustering_datasets.clone()),
                    ),
                    TaskKind::DocumentSimilarity => Box::new(DocumentSimilarityManager::new(
                        &config.gold_standard_dir,
                        config.distance_metric,
                    )),
                    TaskKind::SemanticAnalogies => {
                        Box::new(SemanticAnalogiesManager::new(&config.gold_standard_dir, config.top_k))
                    }
                }
            })
            .collect()
    }

    /// Load the vectors, create the result directory and run every task
    pub fn run(&self) -> Result<EvaluationReport> {
        let config = &self.config;
        tracing::info!("Loading vectors from {:?}", config.vector_file);
        let space = load_vectors(&config.vector_file, config.vector_file_format, config.vector_size)
            .context(format!("Failed to load vector file: {:?}", config.vector_file))?;

        let results_dir = create_result_directory(config.result_directory.as_deref())?;
        self.run_on(&space, &results_dir)
    }

    /// Run every task on an already loaded vector space
    pub fn run_on(&self, space: &VectorSpace, results_dir: &Path) -> Result<EvaluationReport> {
        let managers = self.managers();
        let start = Instant::now();

        tracing::info!(
            "Running {} tasks on {} vectors ({})",
            managers.len(),
            space.len(),
            if self.config.parallel { "parallel" } else { "sequential" }
        );

        let outcomes: Vec<TaskOutcome> = if self.config.parallel {
            managers
                .par_iter()
                .map(|manager| Self::run_task(manager.as_ref(), space, results_dir))
                .collect()
        } else {
            managers
                .iter()
                .map(|manager| Self::run_task(manager.as_ref(), space, results_dir))
                .collect()
        };

        // merge fragments in task order
        let mut scores = Vec::new();
        let mut logs = Vec::new();
        for outcome in outcomes {
            scores.extend(outcome.scores);
            logs.push((outcome.task, outcome.log));
        }

        let report = EvaluationReport {
            results_dir: results_dir.to_path_buf(),
            scores,
            logs,
        };
        write_score_table(&report.score_table_path(), &report.scores)?;
        write_log_report(&report.log_path(), &report.logs)?;

        tracing::info!(
            "Evaluation finished in {:.2}s: {} scores, {} logged problems",
            start.elapsed().as_secs_f64(),
            report.scores.len(),
            report.problem_count()
        );
        Ok(report)
    }

    fn run_task(manager: &dyn TaskManager, space: &VectorSpace, results_dir: &Path) -> TaskOutcome {
        let start = Instant::now();
        tracing::info!("{} started", manager.task());
        let outcome = manager.evaluate(space, results_dir);
        tracing::info!("{} finished in {:.2}s", manager.task(), start.elapsed().as_secs_f64());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvaluationSettings;
    use std::fs;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fixture(root: &Path) -> PathBuf {
        let gold = root.join("gold");
        write(
            &gold.join("Clustering/teams_cluster.tsv"),
            "name\tlabel\nx\t0\ny\t1\nz\t0\n",
        );
        write(
            &gold.join("SemanticAnalogies/capital_country_entities.txt"),
            "x y z w\n",
        );
        write(&root.join("vectors.txt"), "4 2\nx 1 0\ny 0 1\nz 1 1\nw 0 2\n");
        gold
    }

    fn settings(root: &Path, parallel: bool) -> EvaluationSettings {
        let mut settings = EvaluationSettings::new(root.join("vectors.txt"))
            .with_gold_standard_dir(fixture(root))
            .with_result_directory(root.join("out"));
        settings.vector_size = 2;
        settings.parallel = parallel;
        settings.clustering_datasets = Some(vec!["teams_cluster".to_string()]);
        settings
    }

    #[test]
    fn test_run_writes_score_table_and_log() {
        let dir = tempdir().unwrap();
        let config = settings(dir.path(), false).validate().unwrap();
        let report = EvaluationRunner::new(config).run().unwrap();

        assert_eq!(report.logs.len(), 3);
        // the document similarity gold standard is missing
        let (task, log) = &report.logs[1];
        assert_eq!(*task, TaskKind::DocumentSimilarity);
        assert_eq!(log.entries().len(), 1);

        let table = fs::read_to_string(report.score_table_path()).unwrap();
        assert!(table.starts_with(
            "task_name,gold_standard_file,coverage,model,model_configuration,metric,score_value\n"
        ));
        assert_eq!(table.lines().count(), report.scores.len() + 1);
        assert!(table.contains("Clustering,teams_cluster,1.0,KMeans,-,clustering_accuracy,1.0"));
        assert!(table.contains("SemanticAnalogies,capital_country_entities,1.0,TopK,2,accuracy,"));

        let log = fs::read_to_string(report.log_path()).unwrap();
        assert!(log.contains("=== Clustering ===\nNo problems occurred"));
        assert!(log.contains("=== DocumentSimilarity ==="));
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let sequential_dir = tempdir().unwrap();
        let parallel_dir = tempdir().unwrap();

        let sequential = EvaluationRunner::new(settings(sequential_dir.path(), false).validate().unwrap())
            .run()
            .unwrap();
        let parallel = EvaluationRunner::new(settings(parallel_dir.path(), true).validate().unwrap())
            .run()
            .unwrap();

        assert_eq!(sequential.scores, parallel.scores);
        assert_eq!(
            sequential.logs.iter().map(|(t, _)| *t).collect::<Vec<_>>(),
            parallel.logs.iter().map(|(t, _)| *t).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_missing_vector_file_fails() {
        let dir = tempdir().unwrap();
        let mut settings = settings(dir.path(), false);
        settings.vector_file = Some(dir.path().join("absent.txt"));
        let err = EvaluationRunner::new(settings.validate().unwrap()).run().unwrap_err();
        assert!(format!("{:#}", err).contains("absent.txt"));
    }

    #[test]
    fn test_managers_follow_task_selection() {
        let config = EvaluationSettings::new("v.txt")
            .with_tasks(&["SemanticAnalogies", "Clustering"])
            .validate()
            .unwrap();
        let kinds: Vec<TaskKind> = EvaluationRunner::new(config).managers().iter().map(|m| m.task()).collect();
        assert_eq!(kinds, vec![TaskKind::SemanticAnalogies, TaskKind::Clustering]);
    }
}
