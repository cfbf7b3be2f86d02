//! Error types for index builds

use crate::DocId;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

/// A document whose analysis failed during a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    pub doc_id: DocId,
    pub reason: String,
}

impl fmt::Display for DocumentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "document {}: {}", self.doc_id, self.reason)
    }
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Every failing document is reported, in `doc_id` order.
    #[error("index build failed for {} document(s): {}", .failures.len(), join_failures(.failures))]
    BuildFailure { failures: Vec<DocumentFailure> },
}

fn join_failures(failures: &[DocumentFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
