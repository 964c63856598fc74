//! Item document vectorizers
//!
//! A [`Vectorizer`] learns a vocabulary from a set of item documents and maps
//! documents to dense feature rows over that vocabulary. Items never seen
//! during `fit` are ignored by `transform`.
//!
//! Both strategies wrap the aprender text vectorizers. Items are joined with
//! an ASCII unit separator and split back on it, so items that
//! contain spaces (trigrams, masked messages) stay whole and keep their case.

use std::fmt;
use std::str::FromStr;

use aprender::primitives::Matrix;
use aprender::text::vectorize;
use aprender::text::Tokenizer;
use aprender::AprenderError;
use serde::{Deserialize, Serialize};

use crate::detector::{DetectorError, Result};
use crate::error::AnalysisError;

const ITEM_SEPARATOR: &str = "\u{1f}";

/// Strategy for turning item documents into feature rows
pub trait Vectorizer {
    /// Learn the vocabulary (and any weights) from `docs`
    fn fit(&mut self, docs: &[Vec<String>]) -> Result<()>;

    /// Feature rows for `docs`, one per document
    fn transform(&self, docs: &[Vec<String>]) -> Result<Vec<Vec<f64>>>;

    /// Number of features produced by `transform`
    fn num_features(&self) -> usize;

    fn fit_transform(&mut self, docs: &[Vec<String>]) -> Result<Vec<Vec<f64>>> {
        self.fit(docs)?;
        self.transform(docs)
    }
}

/// Splits a joined item document back into its items
#[derive(Debug, Clone, Copy, Default)]
struct ItemTokenizer;

impl Tokenizer for ItemTokenizer {
    fn tokenize(&self, text: &str) -> std::result::Result<Vec<String>, AprenderError> {
        Ok(text
            .split(ITEM_SEPARATOR)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect())
    }
}

fn join_items(docs: &[Vec<String>]) -> Vec<String> {
    docs.iter()
        .map(|doc| doc.join(ITEM_SEPARATOR))
        .collect()
}

/// aprender refuses to fit when no document has an item
fn has_items(docs: &[Vec<String>]) -> bool {
    docs.iter().flatten().any(|item| !item.is_empty())
}

fn vectorization_error(err: AprenderError) -> DetectorError {
    DetectorError::Vectorization(err.to_string())
}

fn matrix_rows(matrix: &Matrix<f64>) -> Vec<Vec<f64>> {
    let cols = matrix.n_cols();
    if cols == 0 {
        return vec![Vec::new(); matrix.n_rows()];
    }
    matrix.as_slice().chunks(cols).map(<[f64]>::to_vec).collect()
}

fn counter() -> vectorize::CountVectorizer {
    vectorize::CountVectorizer::new()
        .with_tokenizer(Box::new(ItemTokenizer))
        .with_lowercase(false)
}

fn tfidf() -> vectorize::TfidfVectorizer {
    vectorize::TfidfVectorizer::new()
        .with_tokenizer(Box::new(ItemTokenizer))
        .with_lowercase(false)
}

/// Raw term counts
///
/// Vocabulary columns are ordered by corpus frequency, ties by item.
pub struct CountVectorizer {
    inner: vectorize::CountVectorizer,
}

impl CountVectorizer {
    pub fn new() -> Self {
        Self { inner: counter() }
    }
}

impl Default for CountVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CountVectorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountVectorizer")
            .field("num_features", &self.num_features())
            .finish_non_exhaustive()
    }
}

impl Vectorizer for CountVectorizer {
    fn fit(&mut self, docs: &[Vec<String>]) -> Result<()> {
        self.inner = counter();
        if !has_items(docs) {
            return Ok(());
        }
        self.inner.fit(&join_items(docs)).map_err(vectorization_error)
    }

    fn transform(&self, docs: &[Vec<String>]) -> Result<Vec<Vec<f64>>> {
        if docs.is_empty() || self.num_features() == 0 {
            return Ok(vec![Vec::new(); docs.len()]);
        }
        let matrix = self
            .inner
            .transform(&join_items(docs))
            .map_err(vectorization_error)?;
        Ok(matrix_rows(&matrix))
    }

    fn num_features(&self) -> usize {
        self.inner.vocabulary_size()
    }
}

/// Term counts weighted by smoothed inverse document frequency, L2-normalized
pub struct TfidfVectorizer {
    inner: vectorize::TfidfVectorizer,
}

impl TfidfVectorizer {
    pub fn new() -> Self {
        Self { inner: tfidf() }
    }
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TfidfVectorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TfidfVectorizer")
            .field("num_features", &self.num_features())
            .finish_non_exhaustive()
    }
}

impl Vectorizer for TfidfVectorizer {
    fn fit(&mut self, docs: &[Vec<String>]) -> Result<()> {
        self.inner = tfidf();
        if !has_items(docs) {
            return Ok(());
        }
        self.inner.fit(&join_items(docs)).map_err(vectorization_error)
    }

    fn transform(&self, docs: &[Vec<String>]) -> Result<Vec<Vec<f64>>> {
        if docs.is_empty() || self.num_features() == 0 {
            return Ok(vec![Vec::new(); docs.len()]);
        }
        let matrix = self
            .inner
            .transform(&join_items(docs))
            .map_err(vectorization_error)?;

        let mut rows = matrix_rows(&matrix);
        for row in &mut rows {
            let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for v in row.iter_mut() {
                    *v /= norm;
                }
            }
        }
        Ok(rows)
    }

    fn num_features(&self) -> usize {
        self.inner.vocabulary_size()
    }
}

/// Selectable vectorizer strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorizerKind {
    #[default]
    Count,
    Tfidf,
}

impl VectorizerKind {
    pub fn build(&self) -> Box<dyn Vectorizer> {
        match self {
            VectorizerKind::Count => Box::new(CountVectorizer::new()),
            VectorizerKind::Tfidf => Box::new(TfidfVectorizer::new()),
        }
    }
}

impl FromStr for VectorizerKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "count" => Ok(VectorizerKind::Count),
            "tfidf" => Ok(VectorizerKind::Tfidf),
            other => Err(AnalysisError::InvalidConfig(format!(
                "unknown vectorizer '{}' (expected count or tfidf)",
                other
            ))),
        }
    }
}

impl fmt::Display for VectorizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorizerKind::Count => write!(f, "count"),
            VectorizerKind::Tfidf => write!(f, "tfidf"),
        }
    }
}
