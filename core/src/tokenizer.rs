use std::collections::{HashMap, HashSet};

/// Canonical form of a single word. Indexing and lookup both go through this.
pub fn fold_case(word: &str) -> String {
    word.to_lowercase()
}

/// Split text on whitespace and case-fold every token. No other normalization is applied,
/// so punctuation stays attached to the word it touches.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().map(fold_case)
}

/// Occurrence count of every token in a single document.
pub fn term_counts(text: &str) -> HashMap<String, u32> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

/// Distinct tokens of a query, in order of first occurrence.
pub fn distinct_terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text).filter(|t| seen.insert(t.clone())).collect()
}
