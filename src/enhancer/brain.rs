//! Brain: frequency-based template miner
//!
//! Within each group of messages with the same token count, every
//! `(position, token)` pair is counted. For each message the frequency shared
//! by the most of its tokens marks the longest common pattern: tokens at least
//! that frequent are constant, the rest become wildcards.
//!
//! # References
//!
//! Yu, S., He, P., Chen, N., & Wu, Y. (2023). Brain: Log parsing with
//! bidirectional parallel tree. IEEE Transactions on Services Computing.

use std::collections::HashMap;

use super::template::{split_tokens, TemplateMiner, WILDCARD};

/// Brain template miner
#[derive(Debug, Default)]
pub struct Brain;

impl Brain {
    pub fn new() -> Self {
        Self
    }

    /// Frequency value shared by the most tokens; ties go to the higher frequency
    fn pattern_frequency(freqs: &[usize]) -> usize {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for &f in freqs {
            *counts.entry(f).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .max_by_key(|&(freq, n)| (n, freq))
            .map(|(freq, _)| freq)
            .unwrap_or(0)
    }
}

impl TemplateMiner for Brain {
    fn mine(&mut self, messages: &[&str]) -> Vec<String> {
        let tokens: Vec<Vec<String>> = messages.iter().map(|m| split_tokens(m)).collect();

        let mut position_counts: HashMap<(usize, usize, &str), usize> = HashMap::new();
        for t in &tokens {
            for (pos, token) in t.iter().enumerate() {
                *position_counts
                    .entry((t.len(), pos, token.as_str()))
                    .or_insert(0) += 1;
            }
        }

        tokens
            .iter()
            .map(|t| {
                let freqs: Vec<usize> = t
                    .iter()
                    .enumerate()
                    .map(|(pos, token)| {
                        position_counts
                            .get(&(t.len(), pos, token.as_str()))
                            .copied()
                            .unwrap_or(0)
                    })
                    .collect();
                let pattern = Self::pattern_frequency(&freqs);

                t.iter()
                    .zip(&freqs)
                    .map(|(token, &f)| if f >= pattern { token.as_str() } else { WILDCARD })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    fn name(&self) -> &str {
        "brain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rare_tokens_become_wildcards() {
        let mut brain = Brain::new();
        let templates = brain.mine(&[
            "session opened for alice",
            "session opened for bob",
            "session opened for carol",
        ]);
        assert!(templates.iter().all(|t| t == "session opened for <*>"));
    }

    #[test]
    fn test_pattern_frequency_prefers_most_shared() {
        assert_eq!(Brain::pattern_frequency(&[3, 3, 3, 1]), 3);
        assert_eq!(Brain::pattern_frequency(&[2, 2, 1, 1]), 2);
        assert_eq!(Brain::pattern_frequency(&[]), 0);
    }

    #[test]
    fn test_unique_message_keeps_all_tokens() {
        let mut brain = Brain::new();
        let templates = brain.mine(&["kernel panic"]);
        assert_eq!(templates[0], "kernel panic");
    }
}
