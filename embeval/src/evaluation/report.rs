//! Persisted task reports
//!
//! Per task and gold-standard file: `<prefix>_<file>_ignoredData.txt` and
//! `<prefix>_<file>_results.csv`. Per run: the merged score table and the
//! log report.

use crate::alignment::IgnoredSet;
use crate::evaluation::{ScoreTableRow, TaskKind, TaskLog};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A row of a task's raw results CSV
pub trait ResultRow: Serialize {
    /// Column names, in field order
    const HEADER: &'static [&'static str];
}

/// Path of a per-task, per-gold-standard report
pub fn report_path(results_dir: &Path, task: TaskKind, gold_standard_file: &str, suffix: &str) -> PathBuf {
    results_dir.join(format!("{}_{}_{}", task.file_prefix(), gold_standard_file, suffix))
}

/// Write the ignored entity names, one per line
pub fn store_ignored(
    results_dir: &Path,
    task: TaskKind,
    gold_standard_file: &str,
    ignored: &IgnoredSet,
) -> Result<PathBuf> {
    let path = report_path(results_dir, task, gold_standard_file, "ignoredData.txt");
    let file = File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    for name in ignored.names() {
        writeln!(writer, "{}", name)?;
    }
    writer.flush()?;

    tracing::debug!("{}: ignored data: {}", task, ignored.names().len());
    Ok(path)
}

/// Write a task's raw result rows as CSV, header first even when empty
pub fn store_results<R: ResultRow>(
    results_dir: &Path,
    task: TaskKind,
    gold_standard_file: &str,
    rows: &[R],
) -> Result<PathBuf> {
    let path = report_path(results_dir, task, gold_standard_file, "results.csv");
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)
        .with_context(|| format!("Failed to create {:?}", path))?;

    writer.write_record(R::HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(path)
}

/// Write the merged long-format score table
pub fn write_score_table(path: &Path, rows: &[ScoreTableRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create score table: {:?}", path))?;

    writer.write_record([
        "task_name",
        "gold_standard_file",
        "coverage",
        "model",
        "model_configuration",
        "metric",
        "score_value",
    ])?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Write the per-task log report
pub fn write_log_report(path: &Path, logs: &[(TaskKind, TaskLog)]) -> Result<()> {
    let mut content = String::new();
    for (task, log) in logs {
        content.push_str(&format!("=== {} ===\n", task));
        if log.is_empty() {
            content.push_str("No problems occurred\n");
        }
        for entry in log.entries() {
            content.push_str(entry);
            content.push('\n');
        }
        content.push('\n');
    }

    fs::write(path, content).with_context(|| format!("Failed to write log report: {:?}", path))
}
