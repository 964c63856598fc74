//! Out-of-vocabulary detector: share of items the reference set never contained

use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct OovDetector {
    vocabulary: HashSet<String>,
}

impl OovDetector {
    pub fn fit(docs: &[Vec<String>]) -> Self {
        Self {
            vocabulary: docs.iter().flatten().cloned().collect(),
        }
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Unseen items divided by document length; an empty document scores 0
    pub fn score(&self, doc: &[String]) -> f64 {
        if doc.is_empty() {
            return 0.0;
        }
        let unseen = doc.iter().filter(|i| !self.vocabulary.contains(*i)).count();
        unseen as f64 / doc.len() as f64
    }
}
