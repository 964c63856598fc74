//! Rarity model: inverse item frequency against the reference set
//!
//! An item's score is `sqrt(1 - frequency)`, where frequency is its share of
//! all reference items; unseen items score 1.0. A document scores the mean of
//! its items.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct RarityModel {
    counts: HashMap<String, usize>,
    total: usize,
}

impl RarityModel {
    pub fn fit(docs: &[Vec<String>]) -> Self {
        let mut model = Self::default();
        for item in docs.iter().flatten() {
            *model.counts.entry(item.clone()).or_insert(0) += 1;
            model.total += 1;
        }
        model
    }

    pub fn item_score(&self, item: &str) -> f64 {
        let count = self.counts.get(item).copied().unwrap_or(0);
        if count == 0 || self.total == 0 {
            return 1.0;
        }
        let frequency = count as f64 / self.total as f64;
        (1.0 - frequency).sqrt().clamp(0.0, 1.0)
    }

    /// Mean item score; an empty document scores 0
    pub fn score(&self, doc: &[String]) -> f64 {
        if doc.is_empty() {
            return 0.0;
        }
        doc.iter().map(|item| self.item_score(item)).sum::<f64>() / doc.len() as f64
    }
}
