//! KMeans scoring: distance of each test row to the nearest reference centroid

use aprender::cluster::KMeans;
use aprender::traits::UnsupervisedEstimator;

use super::{to_matrix, DetectorError, Result};

/// Clusters fitted on the reference rows
const NUM_CLUSTERS: usize = 2;

/// Mean row per cluster label
fn centers_from_labels(rows: &[Vec<f64>], labels: &[usize], k: usize) -> Vec<Vec<f64>> {
    let cols = rows.first().map_or(0, Vec::len);
    let mut centers = vec![vec![0.0; cols]; k];
    let mut counts = vec![0usize; k];

    for (row, &label) in rows.iter().zip(labels) {
        if label >= k {
            continue;
        }
        for (c, v) in centers[label].iter_mut().zip(row) {
            *c += v;
        }
        counts[label] += 1;
    }

    centers
        .into_iter()
        .zip(counts)
        .filter(|&(_, n)| n > 0)
        .map(|(center, n)| center.into_iter().map(|c| c / n as f64).collect())
        .collect()
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Fit centroids on `train` and score every `test` row
///
/// With a single reference row that row is the only centroid.
pub fn nearest_centroid_distance(train: &[Vec<f64>], test: &[Vec<f64>]) -> Result<Vec<f64>> {
    let centers = match train.len() {
        0 => {
            return Err(DetectorError::InsufficientData {
                required: 1,
                actual: 0,
            })
        }
        1 => train.to_vec(),
        n => {
            let k = NUM_CLUSTERS.min(n);
            let features = to_matrix(train)?;
            let mut kmeans = KMeans::new(k);
            kmeans
                .fit(&features)
                .map_err(|e| DetectorError::Clustering(e.to_string()))?;
            let labels = kmeans.predict(&features);
            centers_from_labels(train, &labels, k)
        }
    };

    Ok(test
        .iter()
        .map(|row| {
            centers
                .iter()
                .map(|c| euclidean(row, c))
                .fold(f64::INFINITY, f64::min)
        })
        .collect())
}
