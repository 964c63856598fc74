//! Anomaly score table produced by the pipeline

use serde::{Deserialize, Serialize};

use crate::detector::ModelSummary;
use crate::pipeline::Granularity;

/// One scored unit (line, file or run)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    /// `seq_id` for lines and files, `run` for runs
    pub key: String,
    pub run: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
    /// One entry per table column
    pub scores: Vec<Option<f64>>,
    pub zscore_sum: Option<f64>,
    pub rank_sum: Option<f64>,
}

impl ScoreRow {
    pub fn new(key: impl Into<String>, run: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            run: run.into(),
            file_name: None,
            line_number: None,
            scores: Vec::new(),
            zscore_sum: None,
            rank_sum: None,
        }
    }
}

/// Score columns (`<model>_pred_ano_proba`) over scored units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyScoreTable {
    pub granularity: Granularity,
    pub columns: Vec<String>,
    pub rows: Vec<ScoreRow>,
    #[serde(default)]
    pub summaries: Vec<ModelSummary>,
}

impl AnomalyScoreTable {
    pub fn new(granularity: Granularity, columns: Vec<String>) -> Self {
        Self {
            granularity,
            columns,
            rows: Vec::new(),
            summaries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True once fusion has filled at least one row
    pub fn is_fused(&self) -> bool {
        self.rows
            .iter()
            .any(|r| r.zscore_sum.is_some() || r.rank_sum.is_some())
    }

    /// Score of `row` in column `name`
    pub fn score(&self, row: usize, name: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == name)?;
        self.rows.get(row)?.scores.get(idx).copied().flatten()
    }

    /// Rows ordered by `zscore_sum`, most anomalous first; unfused rows last
    pub fn top(&self, n: usize) -> Vec<&ScoreRow> {
        let mut rows: Vec<&ScoreRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| match (a.zscore_sum, b.zscore_sum) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        rows.truncate(n);
        rows
    }

    /// Human-readable report: summaries, then the top rows
    pub fn format(&self, top: usize) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "=== Anomaly Scores ({}, {} rows) ===\n",
            self.granularity,
            self.rows.len()
        ));
        for summary in &self.summaries {
            out.push_str(&summary.format());
            out.push('\n');
        }
        if self.is_fused() {
            out.push_str(&format!("\nTop {} by zscore_sum:\n", top.min(self.rows.len())));
            for row in self.top(top) {
                out.push_str(&format!(
                    "  {:<40} zscore_sum={:>8.3} rank_sum={:>8.1}\n",
                    row.key,
                    row.zscore_sum.unwrap_or(f64::NAN),
                    row.rank_sum.unwrap_or(f64::NAN)
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> AnomalyScoreTable {
        let mut t = AnomalyScoreTable::new(
            Granularity::Run,
            vec!["rm_pred_ano_proba".to_string()],
        );
        for (key, z) in [("r1", Some(-1.0)), ("r2", None), ("r3", Some(2.0))] {
            let mut row = ScoreRow::new(key, key);
            row.scores = vec![Some(0.5)];
            row.zscore_sum = z;
            t.rows.push(row);
        }
        t
    }

    #[test]
    fn test_top_orders_by_zscore() {
        let t = table();
        let keys: Vec<&str> = t.top(3).iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["r3", "r1", "r2"]);
    }

    #[test]
    fn test_score_lookup() {
        let t = table();
        assert_eq!(t.score(0, "rm_pred_ano_proba"), Some(0.5));
        assert_eq!(t.score(0, "dt_pred_ano_proba"), None);
    }

    #[test]
    fn test_format_lists_top_rows() {
        let report = table().format(1);
        assert!(report.contains("run, 3 rows"));
        assert!(report.contains("r3"));
        assert!(!report.contains("r1 "));
    }
}
