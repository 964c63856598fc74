//! IPLoM: iterative partitioning template miner
//!
//! 1. Partition messages by token count.
//! 2. Split each partition on the token position with the fewest distinct
//!    values, repeating until the partition is "good" (enough constant
//!    positions) or the split budget is spent.
//! 3. Emit one template per final partition: constant positions keep their
//!    token, all other positions become the wildcard.
//!
//! # References
//!
//! Makanju, A., Zincir-Heywood, A. N., & Milios, E. E. (2009). Clustering
//! event logs using iterative partitioning. In KDD '09 (pp. 1255-1264).

use std::collections::{BTreeMap, HashSet};

use super::template::{split_tokens, TemplateMiner, WILDCARD};

/// IPLoM parameters
#[derive(Debug, Clone)]
pub struct IplomConfig {
    /// Share of constant positions at which a partition stops splitting
    pub cluster_goodness: f64,
    /// Maximum number of position splits applied to a partition
    pub max_splits: usize,
    /// A position is only split on when its distinct values stay below this
    /// share of the partition size
    pub max_value_ratio: f64,
}

impl Default for IplomConfig {
    fn default() -> Self {
        Self {
            cluster_goodness: 0.75,
            max_splits: 3,
            max_value_ratio: 0.5,
        }
    }
}

impl IplomConfig {
    /// Single-pass variant: one position split, no goodness gate
    pub fn single_pass() -> Self {
        Self {
            cluster_goodness: 1.0,
            max_splits: 1,
            max_value_ratio: 0.5,
        }
    }
}

/// IPLoM template miner
#[derive(Debug)]
pub struct Iplom {
    config: IplomConfig,
    name: &'static str,
}

impl Iplom {
    pub fn new(config: IplomConfig) -> Self {
        Self {
            config,
            name: "iplom",
        }
    }

    /// Single-pass partitioning, reported as "pliplom"
    pub fn single_pass() -> Self {
        Self {
            config: IplomConfig::single_pass(),
            name: "pliplom",
        }
    }

    fn constant_share(tokens: &[Vec<String>], members: &[usize]) -> f64 {
        let Some(&first) = members.first() else {
            return 1.0;
        };
        let width = tokens[first].len();
        if width == 0 {
            return 1.0;
        }
        let constant = (0..width)
            .filter(|&pos| members.iter().all(|&m| tokens[m][pos] == tokens[first][pos]))
            .count();
        constant as f64 / width as f64
    }

    /// Position with the fewest distinct values greater than one
    fn split_position(&self, tokens: &[Vec<String>], members: &[usize]) -> Option<usize> {
        let width = tokens[*members.first()?].len();
        let limit = ((members.len() as f64) * self.config.max_value_ratio).max(2.0);

        (0..width)
            .map(|pos| {
                let distinct: HashSet<&str> =
                    members.iter().map(|&m| tokens[m][pos].as_str()).collect();
                (pos, distinct.len())
            })
            .filter(|&(_, n)| n > 1 && (n as f64) <= limit)
            .min_by_key(|&(pos, n)| (n, pos))
            .map(|(pos, _)| pos)
    }

    fn partition(
        &self,
        tokens: &[Vec<String>],
        members: Vec<usize>,
        splits_left: usize,
        out: &mut Vec<Vec<usize>>,
    ) {
        if splits_left == 0
            || members.len() < 2
            || Self::constant_share(tokens, &members) >= self.config.cluster_goodness
        {
            out.push(members);
            return;
        }

        let Some(pos) = self.split_position(tokens, &members) else {
            out.push(members);
            return;
        };

        let mut by_value: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for &m in &members {
            by_value.entry(tokens[m][pos].as_str()).or_default().push(m);
        }
        for (_, part) in by_value {
            self.partition(tokens, part, splits_left - 1, out);
        }
    }

    fn template(tokens: &[Vec<String>], members: &[usize]) -> String {
        let Some(&first) = members.first() else {
            return String::new();
        };
        (0..tokens[first].len())
            .map(|pos| {
                let token = &tokens[first][pos];
                if members.iter().all(|&m| &tokens[m][pos] == token) {
                    token.as_str()
                } else {
                    WILDCARD
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for Iplom {
    fn default() -> Self {
        Self::new(IplomConfig::default())
    }
}

impl TemplateMiner for Iplom {
    fn mine(&mut self, messages: &[&str]) -> Vec<String> {
        let tokens: Vec<Vec<String>> = messages.iter().map(|m| split_tokens(m)).collect();

        let mut by_length: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (idx, t) in tokens.iter().enumerate() {
            by_length.entry(t.len()).or_default().push(idx);
        }

        let mut partitions = Vec::new();
        for (_, members) in by_length {
            self.partition(&tokens, members, self.config.max_splits, &mut partitions);
        }

        let mut templates = vec![String::new(); messages.len()];
        for members in &partitions {
            let template = Self::template(&tokens, members);
            for &m in members {
                templates[m] = template.clone();
            }
        }
        templates
    }

    fn name(&self) -> &str {
        self.name
    }
}
