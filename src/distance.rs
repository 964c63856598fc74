//! Pairwise distance between one target group and its comparison groups
//!
//! Four measures are computed per `(target, comparison)` pair:
//!
//! - cosine similarity of the two vectorized documents
//! - Jaccard overlap of the two item sets
//! - normalized compression distance (zlib) of `target ++ comparison`
//! - containment: share of the target's distinct items found in the comparison
//!
//! Cosine and Jaccard are symmetric; compression and containment depend on
//! which side is the target. The four columns are fused afterwards, with the
//! three similarities oriented lower-is-more-distant.

use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregate::{aggregate, AggregationLevel, Group};
use crate::enhancer::EnhanceOptions;
use crate::error::{AnalysisError, Result};
use crate::fusion::{fuse_scores, FusedColumn};
use crate::log_line::LogTable;
use crate::vectorizer::VectorizerKind;

/// Column used to form groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupColumn {
    #[default]
    Run,
    /// Per file, keyed by `seq_id`
    File,
}

impl GroupColumn {
    fn level(&self) -> AggregationLevel {
        match self {
            GroupColumn::Run => AggregationLevel::Run,
            GroupColumn::File => AggregationLevel::File,
        }
    }
}

impl fmt::Display for GroupColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupColumn::Run => write!(f, "run"),
            GroupColumn::File => write!(f, "file"),
        }
    }
}

/// Parameters of one distance measurement
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceRequest {
    pub target: String,
    /// Restrict comparisons to these groups; `None` compares against all others
    pub comparisons: Option<Vec<String>>,
    pub group_column: GroupColumn,
    pub vectorizer: VectorizerKind,
    /// Used when the table has not been enhanced yet
    pub enhance: EnhanceOptions,
}

impl DistanceRequest {
    pub fn new(target: impl Into<String>, group_column: GroupColumn) -> Self {
        Self {
            target: target.into(),
            comparisons: None,
            group_column,
            vectorizer: VectorizerKind::default(),
            enhance: EnhanceOptions::default(),
        }
    }

    pub fn with_comparisons(mut self, comparisons: Vec<String>) -> Self {
        self.comparisons = Some(comparisons);
        self
    }

    pub fn with_vectorizer(mut self, vectorizer: VectorizerKind) -> Self {
        self.vectorizer = vectorizer;
        self
    }

    pub fn with_enhance(mut self, enhance: EnhanceOptions) -> Self {
        self.enhance = enhance;
        self
    }
}

/// One `(target, comparison)` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceResult {
    pub target: String,
    pub comparison: String,
    pub target_lines: usize,
    pub comparison_lines: usize,
    pub cosine: Option<f64>,
    pub jaccard: Option<f64>,
    pub compression: Option<f64>,
    pub containment: Option<f64>,
    pub zscore_sum: Option<f64>,
    pub rank_sum: Option<f64>,
}

/// Columns fused after measuring, with their orientation
pub fn distance_columns() -> Vec<FusedColumn> {
    vec![
        FusedColumn::lower("cosine"),
        FusedColumn::lower("jaccard"),
        FusedColumn::higher("compression"),
        FusedColumn::lower("containment"),
    ]
}

/// Measure the target group against every comparison group
pub fn measure_distances(
    table: &LogTable,
    request: &DistanceRequest,
) -> Result<Vec<DistanceResult>> {
    let groups = aggregate(table, request.group_column.level(), &request.enhance)?;

    let target = groups
        .groups
        .iter()
        .find(|g| g.key == request.target)
        .ok_or_else(|| AnalysisError::UnknownGroup(request.target.clone()))?;

    // Groups come sorted by key, so comparisons run in lexicographic order
    let comparisons: Vec<&Group> = groups
        .groups
        .iter()
        .filter(|g| g.key != request.target)
        .filter(|g| match &request.comparisons {
            Some(wanted) => wanted.iter().any(|w| w == &g.key),
            None => true,
        })
        .collect();

    if comparisons.is_empty() {
        return Err(AnalysisError::NoComparisonGroups {
            target: request.target.clone(),
        });
    }

    info!(
        target = %request.target,
        comparisons = comparisons.len(),
        group_column = %request.group_column,
        "measuring distances"
    );

    let mut results = Vec::with_capacity(comparisons.len());
    for comparison in comparisons {
        results.push(measure_pair(target, comparison, request.vectorizer)?);
    }

    fuse_scores(results, &distance_columns())
}

fn measure_pair(
    target: &Group,
    comparison: &Group,
    vectorizer: VectorizerKind,
) -> Result<DistanceResult> {
    let target_set: BTreeSet<&str> = target.items.iter().map(String::as_str).collect();
    let comparison_set: BTreeSet<&str> = comparison.items.iter().map(String::as_str).collect();

    let result = DistanceResult {
        target: target.key.clone(),
        comparison: comparison.key.clone(),
        target_lines: target.line_count,
        comparison_lines: comparison.line_count,
        cosine: cosine_similarity(&target.items, &comparison.items, vectorizer)?,
        jaccard: jaccard(&target_set, &comparison_set),
        compression: compression_distance(&target.items, &comparison.items)?,
        containment: containment(&target_set, &comparison_set),
        zscore_sum: None,
        rank_sum: None,
    };
    debug!(
        comparison = %comparison.key,
        cosine = ?result.cosine,
        compression = ?result.compression,
        "measured pair"
    );
    Ok(result)
}

/// Cosine similarity of the two documents, vectorized together
pub fn cosine_similarity(
    a: &[String],
    b: &[String],
    kind: VectorizerKind,
) -> Result<Option<f64>> {
    let docs = vec![a.to_vec(), b.to_vec()];
    let mut vectorizer = kind.build();
    let rows = vectorizer.fit_transform(&docs)?;

    let dot: f64 = rows[0].iter().zip(&rows[1]).map(|(x, y)| x * y).sum();
    let norm_a = rows[0].iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = rows[1].iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(None);
    }
    Ok(Some(dot / (norm_a * norm_b)))
}

pub fn jaccard(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> Option<f64> {
    let union = a.union(b).count();
    if union == 0 {
        return None;
    }
    Some(a.intersection(b).count() as f64 / union as f64)
}

/// Share of `target` items present in `comparison`
pub fn containment(target: &BTreeSet<&str>, comparison: &BTreeSet<&str>) -> Option<f64> {
    if target.is_empty() {
        return None;
    }
    Some(target.intersection(comparison).count() as f64 / target.len() as f64)
}

fn compressed_len(data: &[u8]) -> std::io::Result<usize> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?.len())
}

/// Normalized compression distance: `(C(ab) - min(C(a), C(b))) / max(C(a), C(b))`
pub fn compression_distance(target: &[String], comparison: &[String]) -> Result<Option<f64>> {
    let a = target.join(" ");
    let b = comparison.join(" ");
    let ab = format!("{} {}", a, b);

    let compress = |text: &str| {
        compressed_len(text.as_bytes())
            .map_err(|e| AnalysisError::Output(format!("compression failed: {}", e)))
    };
    let (ca, cb, cab) = (compress(&a)?, compress(&b)?, compress(&ab)?);

    let max = ca.max(cb);
    if max == 0 {
        return Ok(None);
    }
    Ok(Some((cab as f64 - ca.min(cb) as f64) / max as f64))
}
