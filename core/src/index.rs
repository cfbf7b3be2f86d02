//! In-memory inverted index.
//!
//! Maps every token to the documents containing it, with per-document occurrence
//! counts. A build analyzes documents in parallel into a private dictionary and
//! publishes it in one step, so readers see either the previous collection or the
//! new one, never a mix of both.

use crate::error::{DocumentFailure, IndexError, Result};
use crate::tokenizer::{fold_case, term_counts};
use crate::{DocId, Entry};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

pub type TermCounts = HashMap<String, u32>;

/// Turns the text of one document into per-token occurrence counts.
///
/// Called concurrently from rayon workers, once per non-empty document. Tokens must be
/// produced with [`crate::tokenizer::fold_case`] so that lookups find them.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, text: &str) -> anyhow::Result<TermCounts>;
}

/// Whitespace tokenization with case folding.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceAnalyzer;

impl Analyzer for WhitespaceAnalyzer {
    fn analyze(&self, text: &str) -> anyhow::Result<TermCounts> {
        Ok(term_counts(text))
    }
}

/// The document collection and frequency dictionary of one successful build.
#[derive(Debug, Default)]
pub struct IndexSnapshot {
    docs: Vec<String>,
    dictionary: HashMap<String, Vec<Entry>>, // entries sorted by doc_id
}

impl IndexSnapshot {
    /// Entries for an already case-folded term.
    pub fn entries(&self, term: &str) -> &[Entry] {
        self.dictionary.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Copy of the entries for `word`, folded the same way documents are.
    pub fn lookup(&self, word: &str) -> Vec<Entry> {
        self.entries(&fold_case(word.trim())).to_vec()
    }

    pub fn document(&self, doc_id: DocId) -> Option<&str> {
        self.docs.get(doc_id as usize).map(String::as_str)
    }

    pub fn document_count(&self) -> usize {
        self.docs.len()
    }

    pub fn term_count(&self) -> usize {
        self.dictionary.len()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> + '_ {
        self.dictionary.keys().map(String::as_str)
    }
}

pub struct InvertedIndex {
    current: RwLock<Arc<IndexSnapshot>>,
    // serializes rebuilds so they publish in call order
    build_lock: Mutex<()>,
    analyzer: Box<dyn Analyzer>,
}

impl Default for InvertedIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::with_analyzer(WhitespaceAnalyzer)
    }

    pub fn with_analyzer<A: Analyzer + 'static>(analyzer: A) -> Self {
        Self {
            current: RwLock::new(Arc::new(IndexSnapshot::default())),
            build_lock: Mutex::new(()),
            analyzer: Box::new(analyzer),
        }
    }

    /// Replace the whole collection and rebuild the dictionary from it.
    ///
    /// Empty documents keep their `doc_id` slot but contribute no entries. An empty
    /// collection is rejected with [`IndexError::InvalidInput`]. If any document fails
    /// to analyze, the build reports all failures once every worker has finished and the
    /// previously published snapshot stays in place.
    pub fn build(&self, docs: Vec<String>) -> Result<()> {
        if docs.is_empty() {
            return Err(IndexError::InvalidInput("document collection is empty".into()));
        }
        if DocId::try_from(docs.len()).is_err() {
            return Err(IndexError::InvalidInput(format!(
                "{} documents exceed the doc_id range",
                docs.len()
            )));
        }

        let _serial = self.build_lock.lock();
        let start = Instant::now();
        let merged: Mutex<HashMap<String, Vec<Entry>>> = Mutex::new(HashMap::new());

        let outcomes: Vec<std::result::Result<(), DocumentFailure>> = docs
            .par_iter()
            .enumerate()
            .filter(|(_, text)| !text.is_empty())
            .map(|(pos, text)| {
                let doc_id = pos as DocId;
                let counts = self.analyzer.analyze(text).map_err(|err| DocumentFailure {
                    doc_id,
                    reason: format!("{err:#}"),
                })?;
                let mut dict = merged.lock();
                for (term, count) in counts {
                    if count > 0 {
                        dict.entry(term).or_default().push(Entry { doc_id, count });
                    }
                }
                Ok(())
            })
            .collect();

        let failures: Vec<DocumentFailure> = outcomes.into_iter().filter_map(|o| o.err()).collect();
        if !failures.is_empty() {
            tracing::warn!(failed = failures.len(), "index build failed, keeping previous snapshot");
            return Err(IndexError::BuildFailure { failures });
        }

        let mut dictionary = merged.into_inner();
        dictionary
            .par_iter_mut()
            .for_each(|(_, entries)| entries.sort_unstable_by_key(|e| e.doc_id));

        let snapshot = Arc::new(IndexSnapshot { docs, dictionary });
        let (num_docs, num_terms) = (snapshot.document_count(), snapshot.term_count());
        let previous = std::mem::replace(&mut *self.current.write(), snapshot);
        drop(previous);

        tracing::info!(
            num_docs,
            num_terms,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "index build complete"
        );
        Ok(())
    }

    /// Entries for `word` from the current snapshot, sorted by `doc_id`.
    /// An unknown word yields an empty vector.
    pub fn lookup(&self, word: &str) -> Vec<Entry> {
        self.snapshot().lookup(word)
    }

    /// Handle to the currently published snapshot. It stays valid across later rebuilds.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.current.read().clone()
    }

    pub fn document(&self, doc_id: DocId) -> Option<String> {
        self.snapshot().document(doc_id).map(str::to_owned)
    }

    pub fn document_count(&self) -> usize {
        self.snapshot().document_count()
    }

    pub fn term_count(&self) -> usize {
        self.snapshot().term_count()
    }
}
