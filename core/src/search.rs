//! Conjunctive query resolution and term-frequency ranking.

use crate::index::{IndexSnapshot, InvertedIndex};
use crate::tokenizer::distinct_terms;
use crate::{DocId, Entry, RelativeIndex};
use rayon::prelude::*;
use std::cmp::Ordering;

/// Answers queries against a borrowed index. The index must outlive the server.
#[derive(Clone, Copy)]
pub struct SearchServer<'a> {
    index: &'a InvertedIndex,
}

impl<'a> SearchServer<'a> {
    pub fn new(index: &'a InvertedIndex) -> Self {
        Self { index }
    }

    /// One ranked list per query, in input order. Lists are never truncated.
    ///
    /// All queries of a call are resolved against the same snapshot, in parallel.
    pub fn search<S: AsRef<str> + Sync>(&self, queries: &[S]) -> Vec<Vec<RelativeIndex>> {
        let snapshot = self.index.snapshot();
        queries
            .par_iter()
            .map(|q| rank_query(&snapshot, q.as_ref()))
            .collect()
    }

    pub fn search_query(&self, query: &str) -> Vec<RelativeIndex> {
        rank_query(&self.index.snapshot(), query)
    }
}

/// Documents containing every term of `query`, ranked by normalized term frequency.
///
/// Ranks are `absolute / max(absolute)`, sorted descending; equal ranks are ordered
/// by ascending `doc_id`.
pub fn rank_query(snapshot: &IndexSnapshot, query: &str) -> Vec<RelativeIndex> {
    let terms = distinct_terms(query);
    if terms.is_empty() {
        return Vec::new();
    }

    let mut postings: Vec<&[Entry]> = Vec::with_capacity(terms.len());
    for term in &terms {
        let entries = snapshot.entries(term);
        if entries.is_empty() {
            return Vec::new();
        }
        postings.push(entries);
    }
    // rarest term first keeps the running intersection small
    postings.sort_by_key(|entries| entries.len());

    relative_ranks(intersect(&postings))
}

/// `(doc_id, absolute rank)` for every document present in all lists.
fn intersect(postings: &[&[Entry]]) -> Vec<(DocId, u64)> {
    let Some((rarest, rest)) = postings.split_first() else {
        return Vec::new();
    };
    let mut running: Vec<(DocId, u64)> = rarest
        .iter()
        .map(|e| (e.doc_id, u64::from(e.count)))
        .collect();
    for entries in rest {
        running = merge_step(&running, entries);
        if running.is_empty() {
            break;
        }
    }
    running
}

fn merge_step(running: &[(DocId, u64)], entries: &[Entry]) -> Vec<(DocId, u64)> {
    let mut out = Vec::with_capacity(running.len().min(entries.len()));
    let (mut i, mut j) = (0, 0);
    while i < running.len() && j < entries.len() {
        let (doc_id, rank) = running[i];
        let entry = entries[j];
        match doc_id.cmp(&entry.doc_id) {
            Ordering::Equal => {
                out.push((doc_id, rank + u64::from(entry.count)));
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }
    out
}

fn relative_ranks(matches: Vec<(DocId, u64)>) -> Vec<RelativeIndex> {
    let max = matches.iter().map(|&(_, abs)| abs).max().unwrap_or(0);
    // unreachable once every term matched, every count is positive
    if max == 0 {
        return Vec::new();
    }
    let mut ranked: Vec<RelativeIndex> = matches
        .into_iter()
        .map(|(doc_id, abs)| RelativeIndex { doc_id, rank: abs as f32 / max as f32 })
        .collect();
    ranked.sort_by(|a, b| b.rank.total_cmp(&a.rank).then_with(|| a.doc_id.cmp(&b.doc_id)));
    ranked
}
