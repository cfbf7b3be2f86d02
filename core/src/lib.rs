use serde::{Deserialize, Serialize};

pub mod error;
pub mod index;
pub mod persist;
pub mod search;
pub mod tokenizer;

pub use error::{DocumentFailure, IndexError};
pub use index::{Analyzer, IndexSnapshot, InvertedIndex, TermCounts, WhitespaceAnalyzer};
pub use search::SearchServer;

/// Zero-based position of a document in the collection passed to the last build.
pub type DocId = u32;

/// Occurrences of one token in one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub doc_id: DocId,
    pub count: u32,
}

/// Relevance of a document for one query, normalized to `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeIndex {
    pub doc_id: DocId,
    pub rank: f32,
}
