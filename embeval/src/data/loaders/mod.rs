//! Loaders for vector files and gold-standard datasets
//!
//! Supports plain-text vector files, tab-separated cluster labels, JSON
//! document-entity tables, CSV human scores and whitespace-separated analogy
//! quadruples.

use crate::data::{AnalogyQuadruple, ClusterLabel, DocumentEntity, HumanScore};
use crate::embedding::{Embedding, VectorSpace};
use crate::error::EvalError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

/// On-disk format of the vector file under evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorFileFormat {
    /// One entity per line: name followed by its components
    Txt,
}

impl Default for VectorFileFormat {
    fn default() -> Self {
        Self::Txt
    }
}

impl std::str::FromStr for VectorFileFormat {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "txt" => Ok(Self::Txt),
            "hdf5" => Err(EvalError::config(
                "hdf5 vector files are not supported. Supported formats: txt",
            )),
            _ => Err(EvalError::config(format!(
                "Not supported file format: {}. Supported formats: txt",
                s
            ))),
        }
    }
}

impl std::fmt::Display for VectorFileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Txt => write!(f, "txt"),
        }
    }
}

/// Load the vector file under evaluation
pub fn load_vectors(path: &Path, format: VectorFileFormat, vector_size: usize) -> Result<VectorSpace> {
    match format {
        VectorFileFormat::Txt => load_text_vectors(path, vector_size),
    }
}

/// Load a whitespace-separated text vector file
///
/// Every line holds an entity name followed by at least `vector_size`
/// floats; extra trailing columns are dropped. A word2vec-style
/// `<count> <dim>` header line is skipped.
pub fn load_text_vectors(path: &Path, vector_size: usize) -> Result<VectorSpace> {
    let file = File::open(path).with_context(|| format!("Failed to open vector file: {:?}", path))?;
    let reader = BufReader::new(file);

    let mut rows: Vec<(String, Embedding)> = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {} of {:?}", line_num + 1, path))?;
        let mut tokens = line.split_whitespace();
        let Some(name) = tokens.next() else {
            continue;
        };
        let values: Vec<&str> = tokens.collect();

        if line_num == 0 && is_word2vec_header(name, &values) {
            tracing::debug!("Skipping vector file header: {}", line);
            continue;
        }

        if values.len() < vector_size {
            anyhow::bail!(
                "Line {} of {:?} has {} components, expected {}",
                line_num + 1,
                path,
                values.len(),
                vector_size
            );
        }

        let vector = values[..vector_size]
            .iter()
            .map(|v| v.parse::<f32>())
            .collect::<std::result::Result<Embedding, _>>()
            .with_context(|| format!("Invalid number at line {} of {:?}", line_num + 1, path))?;

        rows.push((name.to_string(), vector));
    }

    tracing::info!("Loaded {} vectors of size {} from {:?}", rows.len(), vector_size, path);

    VectorSpace::from_rows(rows, vector_size)
}

fn is_word2vec_header(first: &str, rest: &[&str]) -> bool {
    rest.len() == 1 && first.parse::<usize>().is_ok() && rest[0].parse::<usize>().is_ok()
}

/// Load cluster labels from a tab-separated file with `name` and `label` columns
pub fn read_cluster_labels(path: &Path) -> Result<Vec<ClusterLabel>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open cluster gold standard: {:?}", path))?;

    let mut labels = Vec::new();
    for (row_num, result) in reader.deserialize().enumerate() {
        let label: ClusterLabel =
            result.with_context(|| format!("Failed to read row {} of {:?}", row_num + 1, path))?;
        labels.push(label);
    }

    tracing::debug!("Loaded {} cluster labels from {:?}", labels.len(), path);
    Ok(labels)
}

/// Load the document-entity table (JSON array of `{doc, name, weight}`)
pub fn read_document_entities(path: &Path) -> Result<Vec<DocumentEntity>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read document entities: {:?}", path))?;
    let entities: Vec<DocumentEntity> =
        serde_json::from_str(&content).context("Failed to parse document entities JSON")?;

    tracing::debug!("Loaded {} document entities from {:?}", entities.len(), path);
    Ok(entities)
}

/// Load pairwise human similarity scores (CSV with `doc1,doc2,average`)
pub fn read_human_scores(path: &Path) -> Result<Vec<HumanScore>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open human scores: {:?}", path))?;

    let mut scores = Vec::new();
    for (row_num, result) in reader.deserialize().enumerate() {
        let score: HumanScore =
            result.with_context(|| format!("Failed to read row {} of {:?}", row_num + 1, path))?;
        scores.push(score);
    }

    Ok(scores)
}

/// Load analogy quadruples, four whitespace-separated names per line
pub fn read_analogy_quadruples(path: &Path) -> Result<Vec<AnalogyQuadruple>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open analogy gold standard: {:?}", path))?;
    let reader = BufReader::new(file);

    let mut quadruples = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {} of {:?}", line_num + 1, path))?;
        if line.trim().is_empty() {
            continue;
        }

        let names: Vec<&str> = line.split_whitespace().collect();
        match names.as_slice() {
            [a, b, c, d] => quadruples.push(AnalogyQuadruple::new(*a, *b, *c, *d)),
            _ => anyhow::bail!(
                "Line {} of {:?} has {} entities, expected 4",
                line_num + 1,
                path,
                names.len()
            ),
        }
    }

    Ok(quadruples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_text_vectors_skips_header() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "vectors.txt", "2 3\nx 1 0 0\ny 0 1 0 9\n");

        let space = load_text_vectors(&path, 3).unwrap();
        assert_eq!(space.len(), 2);
        assert_eq!(space.dimension(), 3);
        // extra trailing column is dropped
        assert_eq!(space.vector(1).to_vec(), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_load_text_vectors_rejects_short_lines() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "vectors.txt", "x 1 0 0\ny 0 1\n");

        let err = load_text_vectors(&path, 3).unwrap_err();
        assert!(err.to_string().contains("Line 2"));
    }

    #[test]
    fn test_read_cluster_labels() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "c.tsv", "name\tlabel\nBerlin\tcity\nGermany\tcountry\n");

        let labels = read_cluster_labels(&path).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[1].name, "Germany");
        assert_eq!(labels[1].label, "country");
    }

    #[test]
    fn test_read_document_entities_and_scores() {
        let dir = tempdir().unwrap();
        let entities = write_file(
            dir.path(),
            "LP50_entities.json",
            r#"[{"doc": 1, "name": "Apple", "weight": 0.5}, {"doc": 2, "name": "Pear", "weight": 1.0}]"#,
        );
        let scores = write_file(dir.path(), "LP50_averageScores.csv", "doc1,doc2,average\n1,2,3.5\n");

        let entities = read_document_entities(&entities).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].doc, 1);

        let scores = read_human_scores(&scores).unwrap();
        assert_eq!(scores, vec![HumanScore { doc1: 1, doc2: 2, average: 3.5 }]);
    }

    #[test]
    fn test_read_analogy_quadruples() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "a.txt", "Athens Greece Berlin Germany\n\nOslo Norway Rome Italy\n");

        let quadruples = read_analogy_quadruples(&path).unwrap();
        assert_eq!(quadruples.len(), 2);
        assert_eq!(quadruples[1].answer(), "Italy");

        let bad = write_file(dir.path(), "b.txt", "Athens Greece Berlin\n");
        assert!(read_analogy_quadruples(&bad).is_err());
    }

    #[test]
    fn test_parse_file_format() {
        assert_eq!("TXT".parse::<VectorFileFormat>().unwrap(), VectorFileFormat::Txt);
        assert!("hdf5".parse::<VectorFileFormat>().unwrap_err().is_fatal());
        assert!("parquet".parse::<VectorFileFormat>().is_err());
    }
}
