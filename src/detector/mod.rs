//! Train-on-reference, score-test anomaly detectors
//!
//! [`AnomalyDetector`] holds two sets of item documents: the reference (train)
//! set and the set to score (test). Each [`ModelKind`] yields one score per
//! test document, higher meaning more anomalous.
//!
//! - `kmeans`: distance to the nearest reference centroid
//! - `if`: isolation forest fitted on the reference rows
//! - `lr` / `dt`: classifiers trained to tell reference (0) from test (1) rows;
//!   `lr` gives the probability of the test class, `dt` the predicted class
//! - `rm`: mean item rarity against reference item frequencies
//! - `oovd`: share of items never seen in the reference set

mod isolation_forest;
mod kmeans;
mod oov;
mod rarity;
mod summary;

pub use isolation_forest::IsolationForest;
pub use oov::OovDetector;
pub use rarity::RarityModel;
pub use summary::ModelSummary;

use std::fmt;
use std::str::FromStr;

use aprender::classification::LogisticRegression;
use aprender::primitives::Matrix;
use aprender::tree::DecisionTreeClassifier;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::error::AnalysisError;
use crate::vectorizer::VectorizerKind;

/// Errors raised inside detector implementations
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Reference documents produced an empty vocabulary")]
    EmptyVocabulary,

    #[error("Clustering failed: {0}")]
    Clustering(String),

    #[error("Classifier training failed: {0}")]
    Classification(String),

    #[error("Invalid feature matrix: {0}")]
    FeatureMatrix(String),

    #[error("Vectorization failed: {0}")]
    Vectorization(String),

    #[error("Score statistics failed: {0}")]
    Statistics(String),
}

pub type Result<T> = std::result::Result<T, DetectorError>;

/// Number of trees in the isolation forest
const FOREST_TREES: usize = 100;

/// Row-major `f32` matrix for the aprender estimators
fn to_matrix(rows: &[Vec<f64>]) -> Result<Matrix<f32>> {
    let cols = rows.first().map_or(0, Vec::len);
    let data: Vec<f32> = rows.iter().flatten().map(|&v| v as f32).collect();
    Matrix::from_vec(rows.len(), cols, data)
        .map_err(|e| DetectorError::FeatureMatrix(e.to_string()))
}

/// Supported detector models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "kmeans")]
    KMeans,
    #[serde(rename = "lr")]
    LogisticRegression,
    #[serde(rename = "dt")]
    DecisionTree,
    #[serde(rename = "rm")]
    Rarity,
    #[serde(rename = "oovd")]
    OutOfVocabulary,
    #[serde(rename = "if")]
    IsolationForest,
}

impl ModelKind {
    pub const ALL: [ModelKind; 6] = [
        ModelKind::KMeans,
        ModelKind::LogisticRegression,
        ModelKind::DecisionTree,
        ModelKind::Rarity,
        ModelKind::OutOfVocabulary,
        ModelKind::IsolationForest,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            ModelKind::KMeans => "kmeans",
            ModelKind::LogisticRegression => "lr",
            ModelKind::DecisionTree => "dt",
            ModelKind::Rarity => "rm",
            ModelKind::OutOfVocabulary => "oovd",
            ModelKind::IsolationForest => "if",
        }
    }

    /// Score column name, `<tag>_pred_ano_proba`
    pub fn column(&self) -> String {
        format!("{}_pred_ano_proba", self.tag())
    }
}

impl FromStr for ModelKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ModelKind::ALL
            .into_iter()
            .find(|m| m.tag() == s)
            .ok_or_else(|| AnalysisError::UnsupportedModel(s.to_string()))
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Reference and test documents with the settings shared by every model
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    train: Vec<Vec<String>>,
    test: Vec<Vec<String>>,
    vectorizer: VectorizerKind,
    seed: u64,
}

impl AnomalyDetector {
    pub fn new(
        train: Vec<Vec<String>>,
        test: Vec<Vec<String>>,
        vectorizer: VectorizerKind,
        seed: u64,
    ) -> Self {
        Self {
            train,
            test,
            vectorizer,
            seed,
        }
    }

    pub fn train_len(&self) -> usize {
        self.train.len()
    }

    pub fn test_len(&self) -> usize {
        self.test.len()
    }

    /// Feature rows for reference and test documents
    ///
    /// The vocabulary comes from the reference set, or from both sets when
    /// `include_test` is set.
    fn features(&self, include_test: bool) -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>)> {
        let mut vectorizer = self.vectorizer.build();
        if include_test {
            let all: Vec<Vec<String>> = self.train.iter().chain(&self.test).cloned().collect();
            vectorizer.fit(&all)?;
        } else {
            vectorizer.fit(&self.train)?;
        }
        if vectorizer.num_features() == 0 {
            return Err(DetectorError::EmptyVocabulary);
        }
        Ok((vectorizer.transform(&self.train)?, vectorizer.transform(&self.test)?))
    }

    /// Fit `model` on the reference set and score every test document
    pub fn train_and_predict(&self, model: ModelKind) -> Result<Vec<f64>> {
        if self.train.is_empty() {
            return Err(DetectorError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        if self.test.is_empty() {
            return Ok(Vec::new());
        }

        let scores = match model {
            ModelKind::KMeans => {
                let (train, test) = self.features(false)?;
                kmeans::nearest_centroid_distance(&train, &test)?
            }
            ModelKind::IsolationForest => {
                let (train, test) = self.features(false)?;
                let mut forest = IsolationForest::new(FOREST_TREES, None, self.seed);
                forest.fit(&train);
                test.iter().map(|row| forest.anomaly_score(row)).collect()
            }
            ModelKind::LogisticRegression => {
                let (x, labels, test) = self.labelled_features()?;
                let mut lr = LogisticRegression::new();
                lr.fit(&x, &labels)
                    .map_err(|e| DetectorError::Classification(e.to_string()))?;
                lr.predict_proba(&test)
                    .as_slice()
                    .iter()
                    .map(|&p| f64::from(p))
                    .collect()
            }
            ModelKind::DecisionTree => {
                let (x, labels, test) = self.labelled_features()?;
                let mut dt = DecisionTreeClassifier::new();
                dt.fit(&x, &labels)
                    .map_err(|e| DetectorError::Classification(e.to_string()))?;
                // Fully grown leaves are pure unless identical rows carry both
                // labels, where the majority label wins
                dt.predict(&test).into_iter().map(|label| label as f64).collect()
            }
            ModelKind::Rarity => {
                let rm = RarityModel::fit(&self.train);
                self.test.iter().map(|doc| rm.score(doc)).collect()
            }
            ModelKind::OutOfVocabulary => {
                let oov = OovDetector::fit(&self.train);
                self.test.iter().map(|doc| oov.score(doc)).collect()
            }
        };

        debug!(
            model = %model,
            train = self.train.len(),
            test = self.test.len(),
            "scored test documents"
        );
        Ok(scores)
    }

    /// Reference rows labelled 0 followed by test rows labelled 1, plus the
    /// test rows again for prediction
    fn labelled_features(&self) -> Result<(Matrix<f32>, Vec<usize>, Matrix<f32>)> {
        let (train, test) = self.features(true)?;
        let labels: Vec<usize> = std::iter::repeat(0)
            .take(train.len())
            .chain(std::iter::repeat(1).take(test.len()))
            .collect();
        let x: Vec<Vec<f64>> = train.into_iter().chain(test.iter().cloned()).collect();
        Ok((to_matrix(&x)?, labels, to_matrix(&test)?))
    }

    /// Summary statistics of one score column
    pub fn summarize(&self, model: ModelKind, scores: &[f64]) -> Result<ModelSummary> {
        ModelSummary::from_scores(model.column(), scores)
    }
}

#[cfg(test)]
mod tests;
