//! Data models for the guideline corpus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The atomic retrievable unit: one overlap-aware passage from one page of
/// one source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier, `{document_name}_page{p}_chunk{n}` where `n` is
    /// the chunk counter within the page. Re-processing identical input
    /// bytes reproduces identical ids.
    pub chunk_id: String,
    /// Source guideline this chunk came from.
    pub document_name: String,
    /// 1-based page of origin.
    pub page_number: u32,
    /// Best-effort label of the enclosing heading; empty when no heading
    /// has been seen yet in the document.
    pub section_title: String,
    /// The passage text.
    pub text: String,
    /// Position of this chunk within its document, used for stable
    /// ordering and tie-breaks.
    pub sequence_index: u32,
    /// Number of words in `text`.
    pub word_count: u32,
    /// Number of characters in `text`.
    pub char_count: u32,
}

/// Per-document build metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document_name: String,
    pub file_name: String,
    pub total_pages: u32,
    pub total_chunks: u32,
    pub processed_at: DateTime<Utc>,
}

/// Serving-readiness snapshot exposed to the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CorpusStatus {
    pub ready: bool,
    pub total_chunks: usize,
    pub total_documents: usize,
}

/// A document that failed to load during a build. The build proceeds with
/// the remaining documents; failures are reported here in aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedDocument {
    pub name: String,
    pub reason: String,
}

/// Outcome of a corpus build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionReport {
    pub documents: Vec<DocumentSummary>,
    pub skipped: Vec<SkippedDocument>,
    pub total_chunks: usize,
}
