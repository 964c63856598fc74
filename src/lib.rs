//! anomalog - train/test log anomaly detection
//!
//! This library loads raw log directories, derives item lists per line
//! (words, trigrams or event template ids), aggregates them per run or file,
//! scores test logs against reference logs with several detectors, and fuses
//! the scores into ranked anomaly indicators. A distance engine compares one
//! run or file against the others.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod detector;
pub mod distance;
pub mod enhancer;
pub mod error;
pub mod fusion;
pub mod loader;
pub mod log_line;
pub mod output;
pub mod pipeline;
pub mod scores;
pub mod vectorizer;

pub use error::{AnalysisError, Result};
