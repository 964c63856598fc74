//! Log line table produced by the loader and consumed by every later stage

use serde::{Deserialize, Serialize};

/// Derived feature value of a single log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemValue {
    /// Token list (words, trigrams)
    List(Vec<String>),
    /// Categorical value (event template id)
    Scalar(String),
}

impl ItemValue {
    /// Append this value's items to `out`, flattening lists
    pub fn flatten_into(&self, out: &mut Vec<String>) {
        match self {
            ItemValue::List(items) => out.extend(items.iter().cloned()),
            ItemValue::Scalar(item) => out.push(item.clone()),
        }
    }

    /// Items as an owned document
    pub fn to_items(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    pub fn len(&self) -> usize {
        match self {
            ItemValue::List(items) => items.len(),
            ItemValue::Scalar(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One parsed log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    /// Top-level collection (first path segment below the input root)
    pub run: String,
    /// Path of the file below the run directory
    pub file_name: String,
    /// Path of the file below the input root
    pub orig_file_name: String,
    /// `{run}_{file_name}` without the log extension
    pub seq_id: String,
    /// 1-based, contiguous per `seq_id`
    pub line_number: usize,
    /// Raw message text
    pub message: String,
    /// Derived items, present after enhancement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<ItemValue>,
}

/// Counts collected while loading, including discarded lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Files matched by the glob
    pub files: usize,
    /// Lines kept in the table
    pub kept_lines: usize,
    /// Empty lines dropped
    pub dropped_empty: usize,
    /// Lines dropped because they contained the replacement character
    pub dropped_undecodable: usize,
}

impl LoadReport {
    pub fn dropped(&self) -> usize {
        self.dropped_empty + self.dropped_undecodable
    }

    /// Combine two reports (train + test, or several loads)
    pub fn merge(&mut self, other: &LoadReport) {
        self.files += other.files;
        self.kept_lines += other.kept_lines;
        self.dropped_empty += other.dropped_empty;
        self.dropped_undecodable += other.dropped_undecodable;
    }

    pub fn format(&self) -> String {
        format!(
            "files: {}, lines kept: {}, dropped: {} (empty: {}, undecodable: {})",
            self.files,
            self.kept_lines,
            self.dropped(),
            self.dropped_empty,
            self.dropped_undecodable
        )
    }
}

/// Table of log lines, in load order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogTable {
    pub lines: Vec<LogLine>,
    pub report: LoadReport,
}

impl LogTable {
    pub fn new(lines: Vec<LogLine>) -> Self {
        let report = LoadReport {
            kept_lines: lines.len(),
            ..LoadReport::default()
        };
        Self { lines, report }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// True when every line carries an item value
    pub fn is_enhanced(&self) -> bool {
        !self.lines.is_empty() && self.lines.iter().all(|l| l.items.is_some())
    }

    /// Number of lines without an item value
    pub fn missing_items(&self) -> usize {
        self.lines.iter().filter(|l| l.items.is_none()).count()
    }

    /// Keep only lines accepted by `keep`
    ///
    /// Drop counters are carried over and `kept_lines` follows the filtered table.
    pub fn retain(&self, keep: impl Fn(&LogLine) -> bool) -> LogTable {
        let lines: Vec<LogLine> = self.lines.iter().filter(|l| keep(l)).cloned().collect();
        let report = LoadReport {
            kept_lines: lines.len(),
            ..self.report.clone()
        };
        LogTable { lines, report }
    }

    /// Distinct run ids, sorted
    pub fn runs(&self) -> Vec<String> {
        let mut runs: Vec<String> = self.lines.iter().map(|l| l.run.clone()).collect();
        runs.sort();
        runs.dedup();
        runs
    }

    /// Distinct file names (path below the run), sorted
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lines.iter().map(|l| l.file_name.clone()).collect();
        names.sort();
        names.dedup();
        names
    }
}
