//! Error kinds of the label-transfer engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LabelError {
    /// A label id outside `[0, nlabels)`
    #[error("label {label} is outside [0, {nlabels})")]
    InvalidLabel { label: usize, nlabels: usize },

    /// Label/column counts disagree, or indices fall outside the matrix
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A label without any reference column
    #[error("label {label} has no reference columns")]
    EmptyReference { label: usize },

    /// Fine-tuning ran out of rounds with several candidates left.
    /// Reported per column, never returned for a whole batch.
    #[error("fine-tuning of column {column} stopped after {rounds} rounds without a single candidate")]
    ConvergenceGuardTripped { column: usize, rounds: usize },

    /// No feature shared between a reference and the query
    #[error("reference {reference} shares no features with the query")]
    FeatureUniverseMismatch { reference: usize },

    /// A feature the model needs is absent from the query
    #[error("failed to find feature '{0}' in the query")]
    MissingFeature(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to build a thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, LabelError>;
