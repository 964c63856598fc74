//! Token list extractors

/// Split a message into whitespace-separated words
pub fn words(message: &str) -> Vec<String> {
    message.split_whitespace().map(str::to_string).collect()
}

/// Character n-grams over the whole message
///
/// Messages shorter than `n` characters yield no n-grams.
pub fn char_ngrams(message: &str, n: usize) -> Vec<String> {
    let chars: Vec<char> = message.chars().collect();
    if n == 0 || chars.len() < n {
        return Vec::new();
    }
    chars.windows(n).map(|w| w.iter().collect()).collect()
}

/// Character trigrams
pub fn trigrams(message: &str) -> Vec<String> {
    char_ngrams(message, 3)
}
