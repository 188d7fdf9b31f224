//! Error taxonomy for evaluation runs
//!
//! Configuration errors abort a run before any task executes. Every other
//! variant is recovered by the task manager that hit it and ends up in that
//! task's log report.

use thiserror::Error;

/// Errors raised while configuring or scoring an evaluation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// No gold-standard entity was found in the vector space
    #[error("problems in merging vectors with gold standard {file}: no entity is covered")]
    AlignmentEmpty { file: String },

    /// A scoring model raised while training
    #[error("gold standard {file}, model {model}: {message}")]
    ModelFailure {
        file: String,
        model: String,
        message: String,
    },

    /// Nothing was attempted, the score is not computable
    #[error("no data to evaluate: {0}")]
    NoData(String),

    /// A correlation (or a combination of correlations) is undefined
    #[error("degenerate correlation: {0}")]
    DegenerateCorrelation(String),

    /// The run configuration is invalid
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// An analogy batch references an entity missing from the vocabulary
    #[error("entity `{0}` is not in the vocabulary")]
    OutOfVocabulary(String),

    /// A predicted vector does not match the vector space dimension
    #[error("predicted vector has {found} components, the vector space has {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    /// A gold-standard file could not be read or parsed
    #[error("gold standard {file}: {message}")]
    GoldStandard { file: String, message: String },
}

impl EvalError {
    /// Shorthand for [`EvalError::ConfigurationInvalid`]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigurationInvalid(message.into())
    }

    /// Wrap a model error with the gold standard and model that produced it
    pub fn model_failure(
        file: impl Into<String>,
        model: impl Into<String>,
        error: impl std::fmt::Display,
    ) -> Self {
        Self::ModelFailure {
            file: file.into(),
            model: model.into(),
            message: error.to_string(),
        }
    }

    /// Wrap a gold-standard loading error (keeps the whole anyhow chain)
    pub fn gold_standard(file: impl Into<String>, error: &anyhow::Error) -> Self {
        Self::GoldStandard {
            file: file.into(),
            message: format!("{:#}", error),
        }
    }

    /// Whether this error must abort the run instead of being recovered
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigurationInvalid(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_failure_message() {
        let err = EvalError::model_failure("teams_cluster", "KMeans", "n_samples=1 < n_clusters=2");
        let msg = err.to_string();
        assert!(msg.contains("teams_cluster"));
        assert!(msg.contains("KMeans"));
        assert!(msg.contains("n_samples=1"));
    }

    #[test]
    fn test_only_configuration_errors_are_fatal() {
        assert!(EvalError::config("top_k must not be negative").is_fatal());
        assert!(!EvalError::NoData("no quadruples".into()).is_fatal());
        assert!(!EvalError::AlignmentEmpty { file: "LP50".into() }.is_fatal());
    }
}
