//! Tip: token-class template miner
//!
//! Each token is classified on its own: tokens carrying numbers, hex ids,
//! addresses or paths are variable; `key=value` tokens keep the key and mask
//! the value. Tokens that occur in too few messages of the batch are treated
//! as variable too.

use std::collections::{HashMap, HashSet};

use super::template::{has_digit, split_tokens, TemplateMiner, WILDCARD};

/// Tip parameters
#[derive(Debug, Clone)]
pub struct TipConfig {
    /// Minimum number of messages a constant token must appear in
    pub min_support: usize,
}

impl Default for TipConfig {
    fn default() -> Self {
        Self { min_support: 2 }
    }
}

/// Tip template miner
#[derive(Debug, Default)]
pub struct Tip {
    config: TipConfig,
}

impl Tip {
    pub fn new(config: TipConfig) -> Self {
        Self { config }
    }

    fn is_variable(token: &str) -> bool {
        has_digit(token)
            || token.contains('/')
            || token.contains('@')
            || (token.len() >= 8 && token.chars().all(|c| c.is_ascii_hexdigit()))
    }

    fn mask_token(&self, token: &str, support: &HashMap<&str, usize>, batch: usize) -> String {
        if let Some((key, value)) = token.split_once('=') {
            if !key.is_empty() && !value.is_empty() {
                return format!("{}={}", key, WILDCARD);
            }
        }
        // Support is only meaningful once the batch can reach it
        let rare = batch >= self.config.min_support
            && support.get(token).copied().unwrap_or(0) < self.config.min_support;
        if Self::is_variable(token) || rare {
            WILDCARD.to_string()
        } else {
            token.to_string()
        }
    }
}

impl TemplateMiner for Tip {
    fn mine(&mut self, messages: &[&str]) -> Vec<String> {
        let tokens: Vec<Vec<String>> = messages.iter().map(|m| split_tokens(m)).collect();

        // Number of messages containing each token
        let mut support: HashMap<&str, usize> = HashMap::new();
        for t in &tokens {
            let distinct: HashSet<&str> = t.iter().map(String::as_str).collect();
            for token in distinct {
                *support.entry(token).or_insert(0) += 1;
            }
        }

        tokens
            .iter()
            .map(|t| {
                t.iter()
                    .map(|token| self.mask_token(token, &support, tokens.len()))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    fn name(&self) -> &str {
        "tip"
    }
}
