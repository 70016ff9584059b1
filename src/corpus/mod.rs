//! The corpus: every chunk of every processed guideline, its per-document
//! metadata, and the vector index built over it.

pub mod ingest;
pub mod models;
pub mod store;

pub use ingest::{build_corpus, discover_sources};
pub use models::{Chunk, CorpusStatus, DocumentSummary, IngestionReport, SkippedDocument};
pub use store::{CorpusError, CorpusStore};

use std::collections::HashMap;
use std::path::Path;

use crate::index::FlatIndex;

/// An immutable, loaded corpus: chunks in canonical order, document
/// summaries, and the vector index, with exactly one vector per chunk.
///
/// Handles are plain values passed to retrieval operations — there is no
/// ambient "currently loaded corpus", and a process can hold several
/// independent handles at once. Nothing mutates after construction, so
/// shared references need no locking.
pub struct CorpusHandle {
    chunks: Vec<Chunk>,
    documents: Vec<DocumentSummary>,
    index: FlatIndex,
    embedder_id: String,
    positions: HashMap<String, usize>,
}

impl CorpusHandle {
    pub(crate) fn new(
        chunks: Vec<Chunk>,
        documents: Vec<DocumentSummary>,
        index: FlatIndex,
        embedder_id: String,
    ) -> Self {
        let positions = chunks
            .iter()
            .enumerate()
            .map(|(i, c)| (c.chunk_id.clone(), i))
            .collect();
        Self {
            chunks,
            documents,
            index,
            embedder_id,
            positions,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The chunk at an index position, per the canonical order.
    pub fn chunk(&self, position: usize) -> Option<&Chunk> {
        self.chunks.get(position)
    }

    /// Index position of a chunk id.
    pub fn position_of(&self, chunk_id: &str) -> Option<usize> {
        self.positions.get(chunk_id).copied()
    }

    pub fn documents(&self) -> &[DocumentSummary] {
        &self.documents
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    /// Identity of the embedder the corpus was built with.
    pub fn embedder_id(&self) -> &str {
        &self.embedder_id
    }
}

/// Load a previously built corpus from `path`.
///
/// Fails with [`CorpusError::NotFound`] when no artifact exists there, and
/// with [`CorpusError::IndexMismatch`] when the metadata table and vector
/// file disagree — a torn build is never served.
pub fn load_corpus(path: &Path) -> Result<CorpusHandle, CorpusError> {
    let stored = CorpusStore::new(path.to_path_buf()).load()?;
    Ok(CorpusHandle::new(
        stored.chunks,
        stored.documents,
        stored.index,
        stored.embedder_id,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::models::Chunk;

    fn chunk(id: &str, seq: u32) -> Chunk {
        Chunk {
            chunk_id: id.to_string(),
            document_name: "doc".to_string(),
            page_number: 1,
            section_title: String::new(),
            text: "text".to_string(),
            sequence_index: seq,
            word_count: 1,
            char_count: 4,
        }
    }

    #[test]
    fn handle_resolves_positions() {
        let chunks = vec![chunk("a", 0), chunk("b", 1)];
        let index = FlatIndex::build(2, &[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let handle = CorpusHandle::new(chunks, Vec::new(), index, "test".to_string());
        assert_eq!(handle.position_of("b"), Some(1));
        assert_eq!(handle.position_of("missing"), None);
        assert_eq!(handle.chunk(0).unwrap().chunk_id, "a");
    }

    #[test]
    fn load_missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_corpus(&dir.path().join("nothing"));
        assert!(matches!(result, Err(CorpusError::NotFound(_))));
    }
}
