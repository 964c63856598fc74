//! Pipeline configuration
//!
//! A [`PipelineConfig`] can be built in code, deserialized from TOML, or
//! assembled from CLI flags. [`PipelineConfig::validate`] resolves the analysis
//! granularity and rejects conflicting flag combinations before any file is
//! read.
//!
//! # Example
//! ```
//! use anomalog::config::PipelineConfig;
//! use anomalog::pipeline::Granularity;
//!
//! let config = PipelineConfig {
//!     file_level: true,
//!     match_filenames: true,
//!     ..PipelineConfig::default()
//! };
//! assert_eq!(config.validate().unwrap(), Granularity::FileMatched);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::detector::ModelKind;
use crate::enhancer::{EnhanceOptions, ItemListKind, MaskKind};
use crate::error::{AnalysisError, Result};
use crate::loader::LogFormat;
use crate::log_line::LogLine;
use crate::pipeline::Granularity;
use crate::vectorizer::VectorizerKind;

/// Settings of one train/test analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub format: LogFormat,
    pub item_list: ItemListKind,
    pub mask: MaskKind,
    pub models: Vec<ModelKind>,
    pub vectorizer: VectorizerKind,

    /// Aggregate and score per run
    pub run_level: bool,
    /// Aggregate and score per file
    pub file_level: bool,
    /// Train one detector per file name found on both sides
    pub match_filenames: bool,

    /// Keep only these test runs (empty or absent: keep all)
    pub runs_to_include: Option<Vec<String>>,
    /// Keep only these test files, by `orig_file_name` or `file_name`
    pub files_to_include: Option<Vec<String>>,

    /// Seed for stochastic detectors
    pub seed: u64,
    pub project_id: u64,
    pub analysis_id: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            train_path: PathBuf::new(),
            test_path: PathBuf::new(),
            format: LogFormat::Raw,
            item_list: ItemListKind::Words,
            mask: MaskKind::None,
            models: vec![ModelKind::KMeans],
            vectorizer: VectorizerKind::Count,
            run_level: false,
            file_level: false,
            match_filenames: false,
            runs_to_include: None,
            files_to_include: None,
            seed: 42,
            project_id: 0,
            analysis_id: 0,
        }
    }
}

impl PipelineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AnalysisError::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| AnalysisError::InvalidConfig(format!("failed to parse TOML: {}", e)))
    }

    /// Check the configuration and resolve its granularity
    pub fn validate(&self) -> Result<Granularity> {
        if self.models.is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "at least one model is required".to_string(),
            ));
        }
        if self.run_level && self.file_level {
            return Err(AnalysisError::ConflictingGranularity(
                "run_level and file_level are mutually exclusive".to_string(),
            ));
        }
        if self.run_level && self.match_filenames {
            return Err(AnalysisError::ConflictingGranularity(
                "match_filenames applies to file or line level, not run_level".to_string(),
            ));
        }

        Ok(match (self.run_level, self.file_level, self.match_filenames) {
            (true, _, _) => Granularity::Run,
            (_, true, true) => Granularity::FileMatched,
            (_, true, false) => Granularity::File,
            (_, false, true) => Granularity::LineMatched,
            (_, false, false) => Granularity::Line,
        })
    }

    pub fn enhance_options(&self) -> EnhanceOptions {
        EnhanceOptions::new(self.item_list, self.mask)
    }

    pub fn test_filter(&self) -> TestFilter {
        TestFilter::new(self.runs_to_include.clone(), self.files_to_include.clone())
    }
}

/// Exact-match filter applied to the test table after loading
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestFilter {
    runs: Vec<String>,
    files: Vec<String>,
}

impl TestFilter {
    pub fn new(runs: Option<Vec<String>>, files: Option<Vec<String>>) -> Self {
        Self {
            runs: runs.unwrap_or_default(),
            files: files.unwrap_or_default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty() && self.files.is_empty()
    }

    pub fn accepts(&self, line: &LogLine) -> bool {
        let run_ok = self.runs.is_empty() || self.runs.iter().any(|r| *r == line.run);
        let file_ok = self.files.is_empty()
            || self
                .files
                .iter()
                .any(|f| *f == line.orig_file_name || *f == line.file_name);
        run_ok && file_ok
    }
}
