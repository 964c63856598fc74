//! Drain: fixed-depth parse tree template miner
//!
//! Messages are routed by token count, then by their first `depth - 2`
//! tokens, to a leaf holding candidate clusters. A message joins the most
//! similar cluster when the share of matching tokens reaches the similarity
//! threshold; otherwise it starts a new cluster.
//!
//! # References
//!
//! He, P., Zhu, J., Zheng, Z., & Lyu, M. R. (2017). Drain: An online log
//! parsing approach with fixed depth tree. In 2017 IEEE ICWS (pp. 33-40).

use std::collections::HashMap;

use super::template::{has_digit, split_tokens, TemplateMiner, WILDCARD};

/// Drain parameters
#[derive(Debug, Clone)]
pub struct DrainConfig {
    /// Tree depth including the length layer and the leaf layer
    pub depth: usize,
    /// Minimum share of matching tokens to join a cluster
    pub sim_threshold: f64,
    /// Maximum children per internal node before routing to the wildcard
    pub max_children: usize,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            depth: 4,
            sim_threshold: 0.4,
            max_children: 100,
        }
    }
}

#[derive(Debug, Default)]
struct PrefixNode {
    children: HashMap<String, PrefixNode>,
    clusters: Vec<usize>,
}

/// Drain template miner
#[derive(Debug, Default)]
pub struct Drain {
    config: DrainConfig,
    by_length: HashMap<usize, PrefixNode>,
    templates: Vec<Vec<String>>,
}

impl Drain {
    pub fn new(config: DrainConfig) -> Self {
        Self {
            config,
            by_length: HashMap::new(),
            templates: Vec::new(),
        }
    }

    fn prefix_len(&self, tokens: &[String]) -> usize {
        self.config.depth.saturating_sub(2).min(tokens.len())
    }

    fn route_key(token: &str) -> &str {
        if has_digit(token) {
            WILDCARD
        } else {
            token
        }
    }

    /// Leaf for `tokens` without modifying the tree
    fn find_leaf(&self, tokens: &[String]) -> Option<&PrefixNode> {
        let mut node = self.by_length.get(&tokens.len())?;
        for token in &tokens[..self.prefix_len(tokens)] {
            node = node
                .children
                .get(Self::route_key(token))
                .or_else(|| node.children.get(WILDCARD))?;
        }
        Some(node)
    }

    /// Leaf for `tokens`, creating the path as needed
    fn leaf_mut(&mut self, tokens: &[String]) -> &mut PrefixNode {
        let prefix_len = self.prefix_len(tokens);
        let max_children = self.config.max_children;
        let mut node = self.by_length.entry(tokens.len()).or_default();

        for token in &tokens[..prefix_len] {
            let key = Self::route_key(token);
            // The last free child slot is reserved for the wildcard
            let next = if node.children.contains_key(key) || node.children.len() + 1 < max_children
            {
                key.to_string()
            } else {
                WILDCARD.to_string()
            };
            node = node.children.entry(next).or_default();
        }
        node
    }

    /// Share of positions where the template holds the same constant token
    fn similarity(template: &[String], tokens: &[String]) -> (f64, usize) {
        let mut same = 0;
        let mut wildcards = 0;
        for (t, token) in template.iter().zip(tokens) {
            if t == WILDCARD {
                wildcards += 1;
            } else if t == token {
                same += 1;
            }
        }
        if template.is_empty() {
            return (1.0, 0);
        }
        (same as f64 / template.len() as f64, wildcards)
    }

    fn best_cluster(&self, clusters: &[usize], tokens: &[String]) -> Option<usize> {
        let mut best: Option<(usize, f64, usize)> = None;
        for &idx in clusters {
            let (sim, wildcards) = Self::similarity(&self.templates[idx], tokens);
            let better = match best {
                None => true,
                Some((_, best_sim, best_wild)) => {
                    sim > best_sim || (sim == best_sim && wildcards > best_wild)
                }
            };
            if better {
                best = Some((idx, sim, wildcards));
            }
        }
        best.filter(|&(_, sim, _)| sim >= self.config.sim_threshold)
            .map(|(idx, _, _)| idx)
    }

    /// Assign one message to a cluster and return the cluster index
    fn add(&mut self, tokens: Vec<String>) -> usize {
        let matched = self
            .find_leaf(&tokens)
            .and_then(|leaf| self.best_cluster(&leaf.clusters, &tokens));

        match matched {
            Some(idx) => {
                let template = &mut self.templates[idx];
                for (t, token) in template.iter_mut().zip(&tokens) {
                    if t != token {
                        *t = WILDCARD.to_string();
                    }
                }
                idx
            }
            None => {
                let idx = self.templates.len();
                self.leaf_mut(&tokens).clusters.push(idx);
                self.templates.push(tokens);
                idx
            }
        }
    }
}

impl TemplateMiner for Drain {
    fn mine(&mut self, messages: &[&str]) -> Vec<String> {
        let assignments: Vec<usize> = messages
            .iter()
            .map(|m| self.add(split_tokens(m)))
            .collect();

        assignments
            .into_iter()
            .map(|idx| self.templates[idx].join(" "))
            .collect()
    }

    fn name(&self) -> &str {
        "drain"
    }
}
