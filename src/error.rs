//! Error taxonomy for the analysis pipeline
//!
//! Local stages validate their own preconditions and fail fast with a specific
//! variant. Failures raised inside detector implementations are carried through
//! unchanged as [`AnalysisError::Detector`].

use std::path::PathBuf;
use thiserror::Error;

use crate::detector::DetectorError;

/// Errors for pipeline, loader, enhancer, aggregation, distance and fusion operations
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to load log data from {path}: {reason}")]
    DataLoad { path: PathBuf, reason: String },

    #[error("Unsupported log format: {0} (supported: raw)")]
    UnsupportedFormat(String),

    #[error("Unsupported item list kind: {0}")]
    UnsupportedEnhancement(String),

    #[error("Unsupported mask kind: {0}")]
    UnsupportedMask(String),

    #[error("Unsupported anomaly detection model: {0}")]
    UnsupportedModel(String),

    #[error("No comparison groups available for target '{target}'")]
    NoComparisonGroups { target: String },

    #[error("Group '{0}' does not exist in the data")]
    UnknownGroup(String),

    #[error("No common file names between train and test data")]
    NoCommonFiles,

    #[error("Conflicting granularity: {0}")]
    ConflictingGranularity(String),

    #[error("Item list is missing on {missing} of {total} log lines")]
    MissingItemList { missing: usize, total: usize },

    #[error("Column '{0}' does not exist")]
    UnknownColumn(String),

    #[error("Pipeline stage '{stage}' cannot run in state {state}")]
    StageOrder { stage: &'static str, state: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to write results: {0}")]
    Output(String),

    #[error(transparent)]
    Detector(#[from] DetectorError),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    pub(crate) fn data_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        AnalysisError::DataLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
