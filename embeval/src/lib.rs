//! # embeval
//!
//! Intrinsic evaluation of entity embeddings.
//!
//! ## Overview
//!
//! A vector file maps entity names to fixed-size vectors. embeval aligns
//! those vectors with gold-standard datasets and scores them on three tasks:
//!
//! - Clustering - does an ensemble of clustering algorithms recover the
//!   known entity groups?
//! - Document similarity - do entity-based document similarities correlate
//!   with human judgments?
//! - Semantic analogies - does `b - a + c` land near `d`?
//!
//! Every run writes per-task reports plus one long-format score table.
//!
//! ## Architecture
//!
//! - `embedding` - vector space and distance metrics
//! - `data` - gold-standard records and file loaders
//! - `alignment` - intersection of vector space and gold standard, coverage
//! - `evaluation` - task managers, scoring models and reports
//! - `config` - settings and their validation
//! - `runner` - task dispatch and result merging
//! - `cli` - command-line interface
//! - `utils` - common utilities

// Core modules
pub mod alignment;
pub mod data;
pub mod embedding;
pub mod error;
pub mod evaluation;

// Run orchestration
pub mod cli;
pub mod config;
pub mod runner;
pub mod utils;

// Re-export commonly used types
pub use anyhow::{Error, Result};
pub use config::{EvaluationConfig, EvaluationSettings};
pub use error::EvalError;
pub use runner::{EvaluationReport, EvaluationRunner};
