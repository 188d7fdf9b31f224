//! Gold-standard datasets and vector files
//!
//! This module defines the reference datasets each task is scored against
//! and the loaders that read them (and the vector file under evaluation)
//! from disk.

use serde::{Deserialize, Serialize};

pub mod loaders;

// Re-exports for convenience
pub use loaders::*;

/// A gold-standard row that references one or more entities
///
/// Alignment keeps a row only when every entity it names is present in the
/// vector space.
pub trait GoldStandardRow {
    /// Entity names referenced by this row, in a fixed order
    fn entity_names(&self) -> &[String];
}

/// Entity with its true cluster label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterLabel {
    pub name: String,
    pub label: String,
}

impl GoldStandardRow for ClusterLabel {
    fn entity_names(&self) -> &[String] {
        std::slice::from_ref(&self.name)
    }
}

/// Entity mentioned in a document, weighted by the annotators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntity {
    /// Document id (1..=50 for LP50)
    pub doc: u32,
    pub name: String,
    pub weight: f64,
}

impl GoldStandardRow for DocumentEntity {
    fn entity_names(&self) -> &[String] {
        std::slice::from_ref(&self.name)
    }
}

/// Human similarity judgment for a pair of documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanScore {
    pub doc1: u32,
    pub doc2: u32,
    /// Average score over all annotators
    pub average: f64,
}

/// "a is to b as c is to d"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalogyQuadruple {
    names: [String; 4],
}

impl AnalogyQuadruple {
    pub fn new(
        a: impl Into<String>,
        b: impl Into<String>,
        c: impl Into<String>,
        d: impl Into<String>,
    ) -> Self {
        Self {
            names: [a.into(), b.into(), c.into(), d.into()],
        }
    }

    pub fn names(&self) -> &[String; 4] {
        &self.names
    }

    /// The expected answer
    pub fn answer(&self) -> &str {
        &self.names[3]
    }
}

impl GoldStandardRow for AnalogyQuadruple {
    fn entity_names(&self) -> &[String] {
        &self.names
    }
}
