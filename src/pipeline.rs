//! Manual train/test anomaly detection pipeline
//!
//! The pipeline is a small state machine:
//!
//! ```text
//! Created -> Loaded -> Enhanced -> [Aggregated] -> Analyzed -> Succeeded
//!                                                          \-> Failed
//! ```
//!
//! Each stage checks the current state and fails with
//! [`AnalysisError::StageOrder`] when called out of order. A stage that fails
//! moves the pipeline to `Failed` and drops every intermediate table, so no
//! partial results are ever exposed.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, Span};

use crate::aggregate::{aggregate, AggregationLevel, Group, GroupTable};
use crate::config::PipelineConfig;
use crate::detector::{AnomalyDetector, ModelKind, ModelSummary};
use crate::enhancer::enhance;
use crate::error::{AnalysisError, Result};
use crate::fusion::{fuse_scores, FusedColumn};
use crate::loader::load_logs;
use crate::log_line::{LoadReport, LogLine, LogTable};
use crate::scores::{AnomalyScoreTable, ScoreRow};

/// Unit of analysis; exactly one per pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Every line is scored, one global detector
    Line,
    /// Every line is scored, one detector per common file name
    LineMatched,
    Run,
    File,
    /// Files scored with one detector per common file name
    FileMatched,
}

impl Granularity {
    fn aggregation_level(&self) -> Option<AggregationLevel> {
        match self {
            Granularity::Line | Granularity::LineMatched => None,
            Granularity::Run => Some(AggregationLevel::Run),
            Granularity::File => Some(AggregationLevel::File),
            Granularity::FileMatched => Some(AggregationLevel::FileWithName),
        }
    }

    /// Group-level results carry fused columns
    pub fn is_aggregated(&self) -> bool {
        self.aggregation_level().is_some()
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Line => write!(f, "line"),
            Granularity::LineMatched => write!(f, "line_matched"),
            Granularity::Run => write!(f, "run"),
            Granularity::File => write!(f, "file"),
            Granularity::FileMatched => write!(f, "file_matched"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Created,
    Loaded,
    Enhanced,
    Aggregated,
    Analyzed,
    Succeeded,
    Failed,
}

/// Train/test pipeline over two log locations
pub struct ManualTrainTestPipeline {
    config: PipelineConfig,
    granularity: Granularity,
    state: PipelineState,
    span: Span,
    train: Option<LogTable>,
    test: Option<LogTable>,
    train_groups: Option<GroupTable>,
    test_groups: Option<GroupTable>,
    results: Option<AnomalyScoreTable>,
}

impl ManualTrainTestPipeline {
    /// Validate `config` and create a pipeline; no file is touched yet
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let granularity = config.validate()?;
        let span = info_span!(
            "analysis",
            project_id = config.project_id,
            analysis_id = config.analysis_id
        );
        Ok(Self {
            config,
            granularity,
            state: PipelineState::Created,
            span,
            train: None,
            test: None,
            train_groups: None,
            test_groups: None,
            results: None,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn train(&self) -> Option<&LogTable> {
        self.train.as_ref()
    }

    pub fn test(&self) -> Option<&LogTable> {
        self.test.as_ref()
    }

    /// Combined load counts of both sides
    pub fn load_report(&self) -> LoadReport {
        let mut report = LoadReport::default();
        for table in [&self.train, &self.test].into_iter().flatten() {
            report.merge(&table.report);
        }
        report
    }

    /// Analysis results, once `analyze` has succeeded
    pub fn results(&self) -> Option<&AnomalyScoreTable> {
        match self.state {
            PipelineState::Analyzed | PipelineState::Succeeded => self.results.as_ref(),
            _ => None,
        }
    }

    pub fn into_results(self) -> Option<AnomalyScoreTable> {
        match self.state {
            PipelineState::Analyzed | PipelineState::Succeeded => self.results,
            _ => None,
        }
    }

    fn expect_state(&self, stage: &'static str, allowed: &[PipelineState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(AnalysisError::StageOrder {
                stage,
                state: format!("{:?}", self.state),
            })
        }
    }

    /// Run `body`; on error drop all tables and move to `Failed`
    fn run_stage<T>(
        &mut self,
        stage: &'static str,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let _guard = self.span.clone().entered();
        match body(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                error!(
                    stage,
                    project_id = self.config.project_id,
                    analysis_id = self.config.analysis_id,
                    error = %e,
                    "pipeline stage failed"
                );
                self.state = PipelineState::Failed;
                self.train = None;
                self.test = None;
                self.train_groups = None;
                self.test_groups = None;
                self.results = None;
                Err(e)
            }
        }
    }

    /// Load train and test logs; the test side is filtered by run/file
    pub fn load(&mut self) -> Result<()> {
        self.expect_state("load", &[PipelineState::Created])?;
        self.run_stage("load", |p| {
            let train = load_logs(&p.config.train_path, p.config.format)?;
            let mut test = load_logs(&p.config.test_path, p.config.format)?;

            let filter = p.config.test_filter();
            if !filter.is_empty() {
                let before = test.len();
                test = test.retain(|line| filter.accepts(line));
                info!(kept = test.len(), before, "filtered test lines");
                if test.is_empty() {
                    return Err(AnalysisError::data_load(
                        &p.config.test_path,
                        "no test lines match the run/file filter",
                    ));
                }
            }

            info!(
                train_lines = train.len(),
                test_lines = test.len(),
                "loaded train and test logs"
            );
            p.train = Some(train);
            p.test = Some(test);
            p.state = PipelineState::Loaded;
            Ok(())
        })
    }

    /// Enhance both sides with the same options
    pub fn enhance(&mut self) -> Result<()> {
        self.expect_state("enhance", &[PipelineState::Loaded])?;
        self.run_stage("enhance", |p| {
            let options = p.config.enhance_options();
            let (train, test) = p.tables()?;
            let train = enhance(train, &options)?;
            let test = enhance(test, &options)?;
            info!(item_list = %options.item_list, mask = %options.mask, "enhanced train and test logs");
            p.train = Some(train);
            p.test = Some(test);
            p.state = PipelineState::Enhanced;
            Ok(())
        })
    }

    /// Aggregate both sides; does nothing for line granularities
    pub fn aggregate(&mut self) -> Result<()> {
        self.expect_state("aggregate", &[PipelineState::Enhanced])?;
        let Some(level) = self.granularity.aggregation_level() else {
            debug!(granularity = %self.granularity, "line granularity, skipping aggregation");
            return Ok(());
        };
        self.run_stage("aggregate", |p| {
            let options = p.config.enhance_options();
            let (train, test) = p.tables()?;
            let train_groups = aggregate(train, level, &options)?;
            let test_groups = aggregate(test, level, &options)?;
            info!(
                level = %level,
                train_groups = train_groups.len(),
                test_groups = test_groups.len(),
                "aggregated train and test logs"
            );
            p.train_groups = Some(train_groups);
            p.test_groups = Some(test_groups);
            p.state = PipelineState::Aggregated;
            Ok(())
        })
    }

    /// Train and score every requested model
    pub fn analyze(&mut self) -> Result<()> {
        let ready = if self.granularity.is_aggregated() {
            PipelineState::Aggregated
        } else {
            PipelineState::Enhanced
        };
        self.expect_state("analyze", &[ready])?;
        self.run_stage("analyze", |p| {
            let mut table = match p.granularity {
                Granularity::Line => p.analyze_lines(false)?,
                Granularity::LineMatched => p.analyze_lines(true)?,
                Granularity::Run | Granularity::File => p.analyze_groups(false)?,
                Granularity::FileMatched => p.analyze_groups(true)?,
            };

            if p.granularity.is_aggregated() {
                let columns: Vec<FusedColumn> =
                    table.columns.iter().map(FusedColumn::higher).collect();
                table = fuse_scores(table, &columns)?;
            }
            table.summaries = summarize(&table)?;

            info!(
                granularity = %p.granularity,
                rows = table.len(),
                models = p.config.models.len(),
                "analysis complete"
            );
            p.results = Some(table);
            p.state = PipelineState::Analyzed;
            Ok(())
        })
    }

    /// Run every remaining stage in order
    pub fn run(&mut self) -> Result<&AnomalyScoreTable> {
        self.load()?;
        self.enhance()?;
        self.aggregate()?;
        self.analyze()?;
        self.state = PipelineState::Succeeded;
        self.results.as_ref().ok_or(AnalysisError::StageOrder {
            stage: "run",
            state: format!("{:?}", self.state),
        })
    }

    fn tables(&self) -> Result<(&LogTable, &LogTable)> {
        match (&self.train, &self.test) {
            (Some(train), Some(test)) => Ok((train, test)),
            _ => Err(AnalysisError::StageOrder {
                stage: "tables",
                state: format!("{:?}", self.state),
            }),
        }
    }

    fn groups(&self) -> Result<(&GroupTable, &GroupTable)> {
        match (&self.train_groups, &self.test_groups) {
            (Some(train), Some(test)) => Ok((train, test)),
            _ => Err(AnalysisError::StageOrder {
                stage: "groups",
                state: format!("{:?}", self.state),
            }),
        }
    }

    fn empty_table(&self) -> AnomalyScoreTable {
        AnomalyScoreTable::new(
            self.granularity,
            self.config.models.iter().map(ModelKind::column).collect(),
        )
    }

    /// One fresh detector over `train`/`test`, one score column per model
    fn score(&self, train: Vec<Vec<String>>, test: Vec<Vec<String>>) -> Result<Vec<Vec<f64>>> {
        let detector = AnomalyDetector::new(train, test, self.config.vectorizer, self.config.seed);
        self.config
            .models
            .iter()
            .map(|&model| detector.train_and_predict(model).map_err(AnalysisError::from))
            .collect()
    }

    fn push_rows(&self, table: &mut AnomalyScoreTable, rows: Vec<ScoreRow>, columns: Vec<Vec<f64>>) {
        for (i, mut row) in rows.into_iter().enumerate() {
            row.scores = columns
                .iter()
                .map(|c| c.get(i).copied().filter(|v| !v.is_nan()))
                .collect();
            table.rows.push(row);
        }
    }

    fn analyze_lines(&self, matched: bool) -> Result<AnomalyScoreTable> {
        let (train, test) = self.tables()?;
        let mut table = self.empty_table();

        if !matched {
            let columns = self.score(line_docs(train.lines.iter())?, line_docs(test.lines.iter())?)?;
            self.push_rows(&mut table, test.lines.iter().map(line_row).collect(), columns);
            return Ok(table);
        }

        let names = common(train.file_names(), test.file_names())?;
        for name in &names {
            let train_lines = train.lines.iter().filter(|l| &l.file_name == name);
            let test_lines: Vec<&LogLine> =
                test.lines.iter().filter(|l| &l.file_name == name).collect();
            debug!(file_name = %name, test_lines = test_lines.len(), "scoring matched file");
            let columns = self.score(line_docs(train_lines)?, line_docs(test_lines.iter().copied())?)?;
            self.push_rows(
                &mut table,
                test_lines.into_iter().map(line_row).collect(),
                columns,
            );
        }
        Ok(table)
    }

    fn analyze_groups(&self, matched: bool) -> Result<AnomalyScoreTable> {
        let (train, test) = self.groups()?;
        let mut table = self.empty_table();

        if !matched {
            let columns = self.score(train.documents(), test.documents())?;
            self.push_rows(&mut table, test.groups.iter().map(group_row).collect(), columns);
            return Ok(table);
        }

        let names = common(train.file_names(), test.file_names())?;
        for name in &names {
            let train_docs: Vec<Vec<String>> =
                train.with_file_name(name).map(|g| g.items.clone()).collect();
            let test_groups: Vec<&Group> = test.with_file_name(name).collect();
            debug!(file_name = %name, test_files = test_groups.len(), "scoring matched file");
            let columns = self.score(
                train_docs,
                test_groups.iter().map(|g| g.items.clone()).collect(),
            )?;
            self.push_rows(
                &mut table,
                test_groups.into_iter().map(group_row).collect(),
                columns,
            );
        }
        Ok(table)
    }
}

/// File names present on both sides, sorted
fn common(train: Vec<String>, test: Vec<String>) -> Result<Vec<String>> {
    let train: BTreeSet<String> = train.into_iter().collect();
    let names: Vec<String> = test.into_iter().filter(|n| train.contains(n)).collect();
    if names.is_empty() {
        return Err(AnalysisError::NoCommonFiles);
    }
    info!(common_files = names.len(), "matched file names");
    Ok(names)
}

fn line_docs<'a>(lines: impl Iterator<Item = &'a LogLine>) -> Result<Vec<Vec<String>>> {
    let lines: Vec<&LogLine> = lines.collect();
    let missing = lines.iter().filter(|l| l.items.is_none()).count();
    if missing > 0 {
        return Err(AnalysisError::MissingItemList {
            missing,
            total: lines.len(),
        });
    }
    Ok(lines
        .iter()
        .filter_map(|l| l.items.as_ref().map(|i| i.to_items()))
        .collect())
}

fn line_row(line: &LogLine) -> ScoreRow {
    let mut row = ScoreRow::new(line.seq_id.clone(), line.run.clone());
    row.file_name = Some(line.file_name.clone());
    row.line_number = Some(line.line_number);
    row
}

fn group_row(group: &Group) -> ScoreRow {
    let mut row = ScoreRow::new(group.key.clone(), group.run.clone());
    row.file_name = group.file_name.clone();
    row
}

fn summarize(table: &AnomalyScoreTable) -> Result<Vec<ModelSummary>> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let scores: Vec<f64> = table
                .rows
                .iter()
                .filter_map(|r| r.scores.get(idx).copied().flatten())
                .collect();
            ModelSummary::from_scores(column.clone(), &scores).map_err(AnalysisError::from)
        })
        .collect()
}
