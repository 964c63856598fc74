//! Missing-aware score fusion
//!
//! Several score columns are combined into two row-wise summaries:
//!
//! - `zscore_sum`: sum of per-column z-scores (population std over present
//!   values; a zero-variance column contributes 0)
//! - `rank_sum`: sum of per-column 1-based ranks, ties sharing their average
//!   rank
//!
//! Every column is oriented first so that larger always means more anomalous
//! (or more distant). Missing values (`None` or NaN) are skipped by the column
//! statistics and by the row sums; a row with no present value gets `None`.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::distance::DistanceResult;
use crate::error::{AnalysisError, Result};
use crate::scores::AnomalyScoreTable;

/// Name of the fused z-score column
pub const ZSCORE_SUM: &str = "zscore_sum";
/// Name of the fused rank column
pub const RANK_SUM: &str = "rank_sum";

/// Which direction of a column points to anomalies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    HigherIsAnomalous,
    LowerIsAnomalous,
}

/// A column taking part in fusion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusedColumn {
    pub name: String,
    pub orientation: Orientation,
}

impl FusedColumn {
    pub fn new(name: impl Into<String>, orientation: Orientation) -> Self {
        Self {
            name: name.into(),
            orientation,
        }
    }

    pub fn higher(name: impl Into<String>) -> Self {
        Self::new(name, Orientation::HigherIsAnomalous)
    }

    pub fn lower(name: impl Into<String>) -> Self {
        Self::new(name, Orientation::LowerIsAnomalous)
    }
}

/// Containers whose columns can be fused
///
/// The container comes back with its fused columns set, so callers get the
/// same shape they passed in.
pub trait FusionTable {
    fn num_rows(&self) -> usize;

    /// Values of `name` in row order, or `None` when the column does not exist
    fn column_values(&self, name: &str) -> Option<Vec<Option<f64>>>;

    fn set_fused(&mut self, zscore_sum: Vec<Option<f64>>, rank_sum: Vec<Option<f64>>);
}

fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

/// Z-scores of the present values (population std)
pub fn zscores(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let present_values: Vec<f64> = values.iter().filter_map(|v| present(*v)).collect();
    if present_values.is_empty() {
        return vec![None; values.len()];
    }

    let n = present_values.len() as f64;
    let mean = present_values.iter().sum::<f64>() / n;
    let std = (present_values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();

    values
        .iter()
        .map(|v| {
            present(*v).map(|x| {
                if std > 0.0 {
                    (x - mean) / std
                } else {
                    0.0
                }
            })
        })
        .collect()
}

/// Average ranks (1-based, ascending) of the present values
pub fn average_ranks(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut order: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| present(*v).map(|x| (i, x)))
        .collect();
    order.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let mut ranks = vec![None; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && order[end + 1].1 == order[start].1 {
            end += 1;
        }
        // Positions start..=end share ranks start+1..=end+1
        let rank = (start + end) as f64 / 2.0 + 1.0;
        for &(idx, _) in &order[start..=end] {
            ranks[idx] = Some(rank);
        }
        start = end + 1;
    }
    ranks
}

/// Row-wise sums over present entries
fn row_sums(columns: &[Vec<Option<f64>>], rows: usize) -> Vec<Option<f64>> {
    (0..rows)
        .map(|r| {
            columns
                .iter()
                .filter_map(|c| c[r])
                .fold(None, |acc: Option<f64>, v| Some(acc.unwrap_or(0.0) + v))
        })
        .collect()
}

/// Fuse `columns` of `table` into `zscore_sum` and `rank_sum`
pub fn fuse_scores<T: FusionTable>(mut table: T, columns: &[FusedColumn]) -> Result<T> {
    let rows = table.num_rows();
    let mut z_columns = Vec::with_capacity(columns.len());
    let mut rank_columns = Vec::with_capacity(columns.len());

    for column in columns {
        let values = table
            .column_values(&column.name)
            .ok_or_else(|| AnalysisError::UnknownColumn(column.name.clone()))?;
        let oriented: Vec<Option<f64>> = match column.orientation {
            Orientation::HigherIsAnomalous => values,
            Orientation::LowerIsAnomalous => values.into_iter().map(|v| v.map(|x| -x)).collect(),
        };
        z_columns.push(zscores(&oriented));
        rank_columns.push(average_ranks(&oriented));
    }

    debug!(rows, columns = columns.len(), "fusing score columns");
    table.set_fused(row_sums(&z_columns, rows), row_sums(&rank_columns, rows));
    Ok(table)
}

impl FusionTable for AnomalyScoreTable {
    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn column_values(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(
            self.rows
                .iter()
                .map(|r| r.scores.get(idx).copied().flatten())
                .collect(),
        )
    }

    fn set_fused(&mut self, zscore_sum: Vec<Option<f64>>, rank_sum: Vec<Option<f64>>) {
        for ((row, z), r) in self.rows.iter_mut().zip(zscore_sum).zip(rank_sum) {
            row.zscore_sum = z;
            row.rank_sum = r;
        }
    }
}

impl FusionTable for Vec<DistanceResult> {
    fn num_rows(&self) -> usize {
        self.len()
    }

    fn column_values(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let pick: fn(&DistanceResult) -> Option<f64> = match name {
            "cosine" => |d| d.cosine,
            "jaccard" => |d| d.jaccard,
            "compression" => |d| d.compression,
            "containment" => |d| d.containment,
            _ => return None,
        };
        Some(self.iter().map(pick).collect())
    }

    fn set_fused(&mut self, zscore_sum: Vec<Option<f64>>, rank_sum: Vec<Option<f64>>) {
        for ((row, z), r) in self.iter_mut().zip(zscore_sum).zip(rank_sum) {
            row.zscore_sum = z;
            row.rank_sum = r;
        }
    }
}

/// Flat record of named scores
pub type ScoreRecord = BTreeMap<String, Option<f64>>;

impl FusionTable for Vec<ScoreRecord> {
    fn num_rows(&self) -> usize {
        self.len()
    }

    /// A column exists when at least one record carries it; records without
    /// the key read as missing.
    fn column_values(&self, name: &str) -> Option<Vec<Option<f64>>> {
        if !self.is_empty() && !self.iter().any(|r| r.contains_key(name)) {
            return None;
        }
        Some(self.iter().map(|r| r.get(name).copied().flatten()).collect())
    }

    fn set_fused(&mut self, zscore_sum: Vec<Option<f64>>, rank_sum: Vec<Option<f64>>) {
        for ((row, z), r) in self.iter_mut().zip(zscore_sum).zip(rank_sum) {
            row.insert(ZSCORE_SUM.to_string(), z);
            row.insert(RANK_SUM.to_string(), r);
        }
    }
}
