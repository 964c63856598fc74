//! Result persistence and export
//!
//! Completed analyses are written once through a [`ResultStore`], keyed by
//! the analysis id. Score tables and distance results can also be exported
//! as CSV or rendered as plain text.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::distance::DistanceResult;
use crate::error::{AnalysisError, Result};
use crate::scores::AnomalyScoreTable;

/// Any persisted analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisResult {
    Scores(AnomalyScoreTable),
    Distances { rows: Vec<DistanceResult> },
}

/// Storage for completed analyses
pub trait ResultStore {
    /// Persist `result` under `id`, returning where it was written
    fn save(&self, id: u64, result: &AnalysisResult) -> Result<PathBuf>;

    fn load(&self, id: u64) -> Result<AnalysisResult>;
}

/// Stores each result as `{id}.json` inside one directory
#[derive(Debug, Clone)]
pub struct JsonResultStore {
    dir: PathBuf,
}

impl JsonResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

impl ResultStore for JsonResultStore {
    fn save(&self, id: u64, result: &AnalysisResult) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| AnalysisError::Output(format!("{}: {}", self.dir.display(), e)))?;
        let path = self.path_for(id);
        let json = serde_json::to_string_pretty(result)
            .map_err(|e| AnalysisError::Output(e.to_string()))?;
        fs::write(&path, json)
            .map_err(|e| AnalysisError::Output(format!("{}: {}", path.display(), e)))?;
        info!(id, path = %path.display(), "stored analysis result");
        Ok(path)
    }

    fn load(&self, id: u64) -> Result<AnalysisResult> {
        let path = self.path_for(id);
        let content = fs::read_to_string(&path)
            .map_err(|e| AnalysisError::Output(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| AnalysisError::Output(format!("{}: {}", path.display(), e)))
    }
}

/// Escape CSV field (handle commas, quotes, newlines)
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Missing values become empty cells
fn number_field(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Score table as CSV: identity columns, one column per model, fused columns
pub fn scores_to_csv(table: &AnomalyScoreTable) -> String {
    let mut output = String::new();

    let mut header = vec!["key", "run", "file_name", "line_number"];
    header.extend(table.columns.iter().map(String::as_str));
    header.extend(["zscore_sum", "rank_sum"]);
    output.push_str(
        &header
            .iter()
            .map(|h| escape_field(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    output.push('\n');

    for row in &table.rows {
        let mut fields = vec![
            escape_field(&row.key),
            escape_field(&row.run),
            row.file_name.as_deref().map(escape_field).unwrap_or_default(),
            row.line_number.map(|n| n.to_string()).unwrap_or_default(),
        ];
        fields.extend(row.scores.iter().map(|s| number_field(*s)));
        fields.push(number_field(row.zscore_sum));
        fields.push(number_field(row.rank_sum));
        output.push_str(&fields.join(","));
        output.push('\n');
    }

    output
}

pub fn distances_to_csv(rows: &[DistanceResult]) -> String {
    let mut output = String::from(
        "target,comparison,target_lines,comparison_lines,cosine,jaccard,compression,containment,zscore_sum,rank_sum\n",
    );
    for r in rows {
        let fields = [
            escape_field(&r.target),
            escape_field(&r.comparison),
            r.target_lines.to_string(),
            r.comparison_lines.to_string(),
            number_field(r.cosine),
            number_field(r.jaccard),
            number_field(r.compression),
            number_field(r.containment),
            number_field(r.zscore_sum),
            number_field(r.rank_sum),
        ];
        output.push_str(&fields.join(","));
        output.push('\n');
    }
    output
}

fn cell(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.4}", v))
        .unwrap_or_else(|| "-".to_string())
}

/// Distance rows as an aligned text table
pub fn format_distances(rows: &[DistanceResult]) -> String {
    let mut out = String::new();
    if let Some(first) = rows.first() {
        out.push_str(&format!(
            "=== Distances from {} ({} lines) ===\n",
            first.target, first.target_lines
        ));
    }
    out.push_str(&format!(
        "{:<32} {:>8} {:>8} {:>8} {:>11} {:>11} {:>9} {:>8}\n",
        "comparison", "lines", "cosine", "jaccard", "compression", "containment", "zscore", "rank"
    ));
    for r in rows {
        out.push_str(&format!(
            "{:<32} {:>8} {:>8} {:>8} {:>11} {:>11} {:>9} {:>8}\n",
            r.comparison,
            r.comparison_lines,
            cell(r.cosine),
            cell(r.jaccard),
            cell(r.compression),
            cell(r.containment),
            cell(r.zscore_sum),
            cell(r.rank_sum)
        ));
    }
    out
}
