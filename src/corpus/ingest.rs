//! Offline corpus construction.
//!
//! Load → chunk → embed → index → publish. Per-document load failures are
//! collected and reported, not fatal; the build aborts only when nothing at
//! all could be ingested or when a shared capability (embedder, index,
//! storage) fails.

use std::path::Path;

use chrono::Utc;
use walkdir::WalkDir;

use super::models::{Chunk, DocumentSummary, IngestionReport, SkippedDocument};
use super::store::{CorpusError, CorpusStore};
use super::CorpusHandle;
use crate::chunker::chunk_document;
use crate::config::RetrievalConfig;
use crate::embed::Embedder;
use crate::index::FlatIndex;
use crate::loader::{load_pages, DocumentSource};

/// Embedding batch size for build-time throughput.
const EMBED_BATCH: usize = 32;

/// Discover loadable documents (pdf/txt/md) under `dir`, sorted by file
/// name so corpus order is reproducible.
pub fn discover_sources(dir: &Path) -> Result<Vec<DocumentSource>, CorpusError> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let ext = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        if matches!(ext.as_deref(), Some("pdf" | "txt" | "md")) {
            paths.push(entry.path().to_path_buf());
        }
    }
    if paths.is_empty() {
        return Err(CorpusError::NoSources);
    }

    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        sources.push(DocumentSource::from_path(&path)?);
    }
    Ok(sources)
}

/// Build a corpus from `sources`, persist it under `out_dir`, and return
/// the loaded handle along with the ingestion report.
///
/// Unreadable documents are skipped (logged + reported); a build in which
/// every document fails, or which yields zero chunks, fails with
/// [`CorpusError::EmptyCorpus`] rather than publishing an empty artifact.
pub fn build_corpus(
    sources: &[DocumentSource],
    embedder: &dyn Embedder,
    config: &RetrievalConfig,
    out_dir: &Path,
) -> Result<(CorpusHandle, IngestionReport), CorpusError> {
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut documents: Vec<DocumentSummary> = Vec::new();
    let mut skipped: Vec<SkippedDocument> = Vec::new();
    let mut seen_names = std::collections::HashSet::new();

    for source in sources {
        // Chunk ids are derived from the document name; a second document
        // with the same name would collide.
        if !seen_names.insert(source.name.clone()) {
            log::warn!("skipping {}: duplicate document name", source.file_name);
            skipped.push(SkippedDocument {
                name: source.file_name.clone(),
                reason: "duplicate document name".to_string(),
            });
            continue;
        }
        let pages = match load_pages(source) {
            Ok(pages) => pages,
            Err(err) => {
                log::warn!("skipping {}: {err}", source.name);
                skipped.push(SkippedDocument {
                    name: source.name.clone(),
                    reason: err.to_string(),
                });
                continue;
            }
        };

        let document_chunks = chunk_document(&source.name, &pages, &config.chunking);
        if document_chunks.is_empty() {
            log::warn!("skipping {}: no text extracted", source.name);
            skipped.push(SkippedDocument {
                name: source.name.clone(),
                reason: "no text extracted".to_string(),
            });
            continue;
        }

        log::info!(
            "{}: {} pages, {} chunks",
            source.name,
            pages.len(),
            document_chunks.len()
        );
        documents.push(DocumentSummary {
            document_name: source.name.clone(),
            file_name: source.file_name.clone(),
            total_pages: pages.len() as u32,
            total_chunks: document_chunks.len() as u32,
            processed_at: Utc::now(),
        });
        chunks.extend(document_chunks);
    }

    if chunks.is_empty() {
        return Err(CorpusError::EmptyCorpus);
    }

    log::info!("embedding {} chunks", chunks.len());
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
    for batch in texts.chunks(EMBED_BATCH) {
        vectors.extend(embedder.embed_batch(batch)?);
    }

    let index = FlatIndex::build(embedder.dimension(), &vectors)?;

    let store = CorpusStore::new(out_dir.to_path_buf());
    store.save(&chunks, &documents, &index, embedder.id())?;

    documents.sort_by(|a, b| a.document_name.cmp(&b.document_name));
    let report = IngestionReport {
        total_chunks: chunks.len(),
        documents: documents.clone(),
        skipped,
    };
    let handle = CorpusHandle::new(chunks, documents, index, embedder.id().to_string());
    Ok((handle, report))
}
