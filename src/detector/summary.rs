//! Aggregate statistics of one score column

use aprender::stats::DescriptiveStats;
use serde::{Deserialize, Serialize};
use trueno::Vector;

use super::{DetectorError, Result};

/// Summary of one `<model>_pred_ano_proba` column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub column: String,
    pub count: usize,
    pub mean: f32,
    pub stddev: f32,
    pub median: f32,
    pub max: f32,
}

impl ModelSummary {
    /// Summarize `scores`; NaN entries are skipped
    pub fn from_scores(column: impl Into<String>, scores: &[f64]) -> Result<Self> {
        let values: Vec<f32> = scores
            .iter()
            .filter(|s| !s.is_nan())
            .map(|&s| s as f32)
            .collect();
        let column = column.into();

        if values.is_empty() {
            return Ok(Self {
                column,
                count: 0,
                mean: 0.0,
                stddev: 0.0,
                median: 0.0,
                max: 0.0,
            });
        }

        let v = Vector::from_slice(&values);
        let mean = v
            .mean()
            .map_err(|e| DetectorError::Statistics(e.to_string()))?;
        let stddev = v
            .stddev()
            .map_err(|e| DetectorError::Statistics(e.to_string()))?;
        let median = DescriptiveStats::new(&v)
            .quantile(0.5)
            .map_err(|e| DetectorError::Statistics(e.to_string()))?;
        let max = values.iter().copied().fold(f32::MIN, f32::max);

        Ok(Self {
            column,
            count: values.len(),
            mean,
            stddev,
            median,
            max,
        })
    }

    pub fn format(&self) -> String {
        format!(
            "{:<24} n={:<6} mean={:.4} std={:.4} median={:.4} max={:.4}",
            self.column, self.count, self.mean, self.stddev, self.median, self.max
        )
    }
}
