//! CLI argument parsing for anomalog

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::PipelineConfig;
use crate::detector::ModelKind;
use crate::distance::{DistanceRequest, GroupColumn};
use crate::enhancer::{EnhanceOptions, ItemListKind, MaskKind};
use crate::error::Result;
use crate::loader::LogFormat;
use crate::vectorizer::VectorizerKind;

/// Output format for analysis results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "anomalog")]
#[command(version)]
#[command(about = "Train/test log anomaly detection and log distance analysis", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Train detectors on reference logs and score test logs
    Analyze(AnalyzeArgs),
    /// Measure distances between one run or file and the others
    Distance(DistanceArgs),
    /// Load logs and report kept and dropped lines
    Load(LoadArgs),
}

/// Enhancement flags shared by every subcommand that derives items
#[derive(Args, Debug, Clone)]
pub struct EnhanceArgs {
    /// Item list kind (e_words, e_trigrams, e_event_drain_id, ...)
    #[arg(long = "item-list", value_name = "KIND")]
    pub item_list: Option<ItemListKind>,

    /// Mask applied before extraction (myllari, myllari_extended, drain_loglead, drain_orig, none)
    #[arg(long, value_name = "MASK")]
    pub mask: Option<MaskKind>,

    /// Vectorizer used for feature rows (count or tfidf)
    #[arg(long, value_name = "KIND")]
    pub vectorizer: Option<VectorizerKind>,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// TOML configuration file; flags override its values
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Reference (train) log file or directory
    #[arg(long, value_name = "PATH")]
    pub train: Option<PathBuf>,

    /// Log file or directory to score
    #[arg(long, value_name = "PATH")]
    pub test: Option<PathBuf>,

    /// Log format of both inputs
    #[arg(long = "log-format", value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,

    #[command(flatten)]
    pub enhance: EnhanceArgs,

    /// Detector model (kmeans, lr, dt, rm, oovd, if); repeatable
    #[arg(short, long = "model", value_name = "MODEL")]
    pub models: Vec<ModelKind>,

    /// Score per run
    #[arg(long)]
    pub run_level: bool,

    /// Score per file
    #[arg(long)]
    pub file_level: bool,

    /// Train one detector per file name present in both train and test
    #[arg(long)]
    pub match_filenames: bool,

    /// Keep only these test runs; repeatable
    #[arg(long = "run", value_name = "RUN")]
    pub runs: Vec<String>,

    /// Keep only these test files; repeatable
    #[arg(long = "file", value_name = "FILE")]
    pub files: Vec<String>,

    /// Seed for stochastic detectors
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub project_id: Option<u64>,

    #[arg(long)]
    pub analysis_id: Option<u64>,

    /// Store the result as `<analysis-id>.json` in this directory
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Rows listed in the text report
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

impl AnalyzeArgs {
    /// Merge the config file (if any) with the flags
    pub fn to_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(train) = &self.train {
            config.train_path = train.clone();
        }
        if let Some(test) = &self.test {
            config.test_path = test.clone();
        }
        if let Some(format) = self.log_format {
            config.format = format;
        }
        if let Some(item_list) = self.enhance.item_list {
            config.item_list = item_list;
        }
        if let Some(mask) = self.enhance.mask {
            config.mask = mask;
        }
        if let Some(vectorizer) = self.enhance.vectorizer {
            config.vectorizer = vectorizer;
        }
        if !self.models.is_empty() {
            config.models = self.models.clone();
        }
        config.run_level |= self.run_level;
        config.file_level |= self.file_level;
        config.match_filenames |= self.match_filenames;
        if !self.runs.is_empty() {
            config.runs_to_include = Some(self.runs.clone());
        }
        if !self.files.is_empty() {
            config.files_to_include = Some(self.files.clone());
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(project_id) = self.project_id {
            config.project_id = project_id;
        }
        if let Some(analysis_id) = self.analysis_id {
            config.analysis_id = analysis_id;
        }
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct DistanceArgs {
    /// Log file or directory holding all groups
    pub input: PathBuf,

    /// Target run (or seq_id with --group-by file)
    #[arg(short, long)]
    pub target: String,

    /// Compare only against these groups; repeatable
    #[arg(long = "comparison", value_name = "GROUP")]
    pub comparisons: Vec<String>,

    /// Grouping column
    #[arg(long = "group-by", value_enum, default_value = "run")]
    pub group_by: GroupBy,

    #[command(flatten)]
    pub enhance: EnhanceArgs,

    /// Store the result as `<analysis-id>.json` in this directory
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 0)]
    pub analysis_id: u64,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupBy {
    Run,
    File,
}

impl DistanceArgs {
    pub fn to_request(&self) -> DistanceRequest {
        let group_column = match self.group_by {
            GroupBy::Run => GroupColumn::Run,
            GroupBy::File => GroupColumn::File,
        };
        let mut request = DistanceRequest::new(self.target.clone(), group_column)
            .with_vectorizer(self.enhance.vectorizer.unwrap_or_default())
            .with_enhance(EnhanceOptions::new(
                self.enhance.item_list.unwrap_or_default(),
                self.enhance.mask.unwrap_or_default(),
            ));
        if !self.comparisons.is_empty() {
            request = request.with_comparisons(self.comparisons.clone());
        }
        request
    }
}

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Log file or directory
    pub input: PathBuf,

    #[arg(long = "log-format", default_value = "raw")]
    pub log_format: LogFormat,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,
}
