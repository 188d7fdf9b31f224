//! Common utilities

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Parent of the default, timestamped result directories
pub const DEFAULT_RESULTS_ROOT: &str = "results";

/// Create the directory that receives a run's reports
///
/// Uses `requested` when given; a requested path that is an existing file
/// falls back to the default `results/result_<YYYYmmdd_HHMMSS>`.
pub fn create_result_directory(requested: Option<&Path>) -> Result<PathBuf> {
    create_result_directory_in(Path::new(DEFAULT_RESULTS_ROOT), requested)
}

/// [`create_result_directory`] with an explicit root for the default directory
pub fn create_result_directory_in(root: &Path, requested: Option<&Path>) -> Result<PathBuf> {
    let dir = match requested {
        Some(path) if path.is_file() => {
            tracing::warn!("Result directory {:?} is a file, using the default location", path);
            default_result_directory(root)
        }
        Some(path) => path.to_path_buf(),
        None => default_result_directory(root),
    };

    fs::create_dir_all(&dir).context(format!("Failed to create result directory: {:?}", dir))?;
    tracing::info!("Results will be stored in {:?}", dir);
    Ok(dir)
}

fn default_result_directory(root: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    root.join(format!("result_{}", stamp))
}
