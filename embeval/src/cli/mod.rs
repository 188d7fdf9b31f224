//! Command-line interface
//!
//! Provides the `evaluate` and `tasks` commands.

use crate::config::EvaluationSettings;
use crate::evaluation::clustering::{expected_cluster_count, AVAILABLE_DATASETS, DEFAULT_DATASETS};
use crate::evaluation::semantic_analogies::DATASETS as ANALOGY_DATASETS;
use crate::evaluation::{document_similarity, TaskKind};
use crate::runner::EvaluationRunner;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Flags of the `evaluate` command; each overrides the settings file
#[derive(Debug, Clone, Default, Args)]
pub struct EvaluateArgs {
    /// JSON settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Vector file to evaluate
    #[arg(short, long)]
    pub vector_file: Option<PathBuf>,

    /// Vector file format (txt)
    #[arg(long)]
    pub vector_file_format: Option<String>,

    /// Number of components per vector
    #[arg(long, allow_negative_numbers = true)]
    pub vector_size: Option<i64>,

    /// Run tasks in parallel
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub parallel: Option<bool>,

    /// Tasks to run, comma separated, or _all
    #[arg(short, long, value_delimiter = ',')]
    pub tasks: Option<Vec<String>>,

    /// Distance metric: cosine, euclidean or manhattan
    #[arg(short, long)]
    pub distance_metric: Option<String>,

    /// k for the semantic analogy task
    #[arg(short = 'k', long, allow_negative_numbers = true)]
    pub top_k: Option<i64>,

    /// Verbose logging
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub debugging_mode: Option<bool>,

    /// Directory holding the gold standards
    #[arg(short, long)]
    pub gold_standard_dir: Option<PathBuf>,

    /// Directory receiving the reports
    #[arg(short, long)]
    pub result_directory: Option<PathBuf>,

    /// Clustering datasets, comma separated
    #[arg(long, value_delimiter = ',')]
    pub clustering_datasets: Option<Vec<String>>,

    /// DBSCAN neighbourhood radius
    #[arg(long)]
    pub dbscan_eps: Option<f64>,

    /// DBSCAN core point threshold
    #[arg(long)]
    pub dbscan_min_samples: Option<usize>,

    /// Number of k-means starts
    #[arg(long)]
    pub kmeans_n_init: Option<usize>,

    /// Seed for k-means starts
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Settings from the `--config` file (or defaults) with CLI flags applied
pub fn load_settings(args: &EvaluateArgs) -> Result<EvaluationSettings> {
    let mut settings = match &args.config {
        Some(path) => EvaluationSettings::from_json_file(path)
            .context(format!("Failed to load settings from {:?}", path))?,
        None => EvaluationSettings::default(),
    };

    if let Some(v) = &args.vector_file {
        settings.vector_file = Some(v.clone());
    }
    if let Some(v) = &args.vector_file_format {
        settings.vector_file_format = v.clone();
    }
    if let Some(v) = args.vector_size {
        settings.vector_size = v;
    }
    if let Some(v) = args.parallel {
        settings.parallel = v;
    }
    if let Some(v) = &args.tasks {
        settings.tasks = v.clone();
    }
    if let Some(v) = &args.distance_metric {
        settings.distance_metric = v.clone();
    }
    if let Some(v) = args.top_k {
        settings.top_k = v;
    }
    if let Some(v) = args.debugging_mode {
        settings.debugging_mode = v;
    }
    if let Some(v) = &args.gold_standard_dir {
        settings.gold_standard_dir = v.clone();
    }
    if let Some(v) = &args.result_directory {
        settings.result_directory = Some(v.clone());
    }
    if let Some(v) = &args.clustering_datasets {
        settings.clustering_datasets = Some(v.clone());
    }
    if let Some(v) = args.dbscan_eps {
        settings.dbscan_eps = v;
    }
    if let Some(v) = args.dbscan_min_samples {
        settings.dbscan_min_samples = v;
    }
    if let Some(v) = args.kmeans_n_init {
        settings.kmeans_n_init = v;
    }
    if let Some(v) = args.seed {
        settings.seed = v;
    }

    Ok(settings)
}

/// Execute the evaluate command
pub fn evaluate(settings: EvaluationSettings) -> Result<()> {
    let config = settings.validate()?;

    tracing::info!("Starting evaluation");
    tracing::info!("  Vector file: {:?}", config.vector_file);
    tracing::info!("  Format: {}", config.vector_file_format);
    tracing::info!("  Vector size: {}", config.vector_size);
    tracing::info!("  Tasks: {:?}", config.tasks);
    tracing::info!("  Distance metric: {}", config.distance_metric);
    tracing::info!("  Top-k: {}", config.top_k);
    tracing::info!("  Gold standards: {:?}", config.gold_standard_dir);

    let report = EvaluationRunner::new(config).run()?;

    println!("\n{}", report);
    println!("  Score table: {}", report.score_table_path().display());
    println!("  Log report: {}", report.log_path().display());

    Ok(())
}

/// Execute the tasks command
pub fn list_tasks() {
    println!("Supported tasks (select with --tasks, or _all):\n");
    for task in TaskKind::ALL {
        println!("{}", task);
        match task {
            TaskKind::Clustering => {
                for dataset in AVAILABLE_DATASETS {
                    let default = if DEFAULT_DATASETS.contains(&dataset) { " (default)" } else { "" };
                    println!(
                        "  {} - {} clusters{}",
                        dataset,
                        expected_cluster_count(dataset).unwrap_or_default(),
                        default
                    );
                }
            }
            TaskKind::DocumentSimilarity => {
                println!(
                    "  {} - {} documents",
                    document_similarity::GOLD_STANDARD_FILE,
                    document_similarity::DOCUMENT_COUNT
                );
            }
            TaskKind::SemanticAnalogies => {
                for dataset in ANALOGY_DATASETS {
                    println!("  {}", dataset);
                }
            }
        }
    }
}
