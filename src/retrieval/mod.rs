//! Query-time retrieval: embedding, ranking, deduplication.
//!
//! The engine borrows an immutable [`CorpusHandle`] and an [`Embedder`];
//! every operation is synchronous and runs to completion. Raw index cosines
//! are mapped onto one fixed normalized scale, `(cosine + 1) / 2` clamped
//! to [0, 1], so callers see a single "higher = more relevant" semantic
//! regardless of the index's raw metric.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use crate::config::RetrievalConfig;
use crate::corpus::{Chunk, CorpusHandle, CorpusStatus, DocumentSummary};
use crate::embed::{EmbedError, Embedder};
use crate::index::IndexError;
use crate::terms::{ClinicalTermExtractor, TermMatch};

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("corpus is not loaded or empty")]
    NotReady,

    #[error("dependency failure: {0}")]
    Dependency(String),
}

impl From<EmbedError> for SearchError {
    fn from(err: EmbedError) -> Self {
        SearchError::Dependency(err.to_string())
    }
}

impl From<IndexError> for SearchError {
    fn from(err: IndexError) -> Self {
        SearchError::Dependency(err.to_string())
    }
}

/// One ranked passage returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunk_id: String,
    /// Normalized similarity in [0, 1]; higher is more relevant.
    pub similarity_score: f32,
    pub document_name: String,
    pub page_number: u32,
    pub section_title: String,
    pub text: String,
}

/// Response of [`SearchEngine::clinical_search`]: the recognized terms plus
/// the same ranked result shape as plain search.
#[derive(Debug, Serialize)]
pub struct ClinicalSearchResponse {
    pub question: String,
    pub terms: Vec<String>,
    pub results: Vec<SearchResult>,
}

pub struct SearchEngine<'a> {
    corpus: &'a CorpusHandle,
    embedder: &'a dyn Embedder,
    extractor: ClinicalTermExtractor,
    overfetch_factor: usize,
    dedup_overlap: f32,
}

impl<'a> SearchEngine<'a> {
    pub fn new(
        corpus: &'a CorpusHandle,
        embedder: &'a dyn Embedder,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            corpus,
            embedder,
            extractor: ClinicalTermExtractor::new(),
            overfetch_factor: config.overfetch_factor.max(1),
            dedup_overlap: config.dedup_overlap,
        }
    }

    /// Ranked semantic search over the corpus.
    pub fn search(&self, query_text: &str, top_k: usize) -> Result<Vec<SearchResult>, SearchError> {
        self.check_args(query_text, top_k)?;
        self.check_ready()?;
        let query_vector = self.embed_query(query_text)?;
        self.ranked(&query_vector, top_k, None, None)
    }

    /// Search with clinical query expansion: recognized domain terms are
    /// appended to the question before embedding. Zero recognized terms
    /// degrades to plain search, never to an error.
    pub fn clinical_search(
        &self,
        question_text: &str,
        top_k: usize,
    ) -> Result<ClinicalSearchResponse, SearchError> {
        self.check_args(question_text, top_k)?;
        self.check_ready()?;

        let matches: Vec<TermMatch> = self.extractor.extract(question_text);
        let expanded = self.extractor.expand_query(question_text);
        let query_vector = self.embed_query(&expanded)?;
        let results = self.ranked(&query_vector, top_k, None, None)?;

        Ok(ClinicalSearchResponse {
            question: question_text.to_string(),
            terms: matches.into_iter().map(|m| m.term).collect(),
            results,
        })
    }

    /// Ranked search restricted to one document.
    pub fn search_in_document(
        &self,
        document_name: &str,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        self.check_args(query_text, top_k)?;
        self.check_ready()?;
        if !self
            .corpus
            .documents()
            .iter()
            .any(|d| d.document_name == document_name)
        {
            return Err(SearchError::InvalidArgument(format!(
                "unknown document: {document_name}"
            )));
        }
        let query_vector = self.embed_query(query_text)?;
        self.ranked(&query_vector, top_k, Some(document_name), None)
    }

    /// Passages most similar to an existing chunk (excluding itself).
    pub fn find_similar(
        &self,
        chunk_id: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if top_k == 0 {
            return Err(SearchError::InvalidArgument(
                "top_k must be positive".to_string(),
            ));
        }
        self.check_ready()?;
        let position = self
            .corpus
            .position_of(chunk_id)
            .ok_or_else(|| SearchError::InvalidArgument(format!("unknown chunk_id: {chunk_id}")))?;
        let query_vector = self
            .corpus
            .index()
            .vector(position)
            .ok_or_else(|| SearchError::Dependency("index lost a stored vector".to_string()))?
            .to_vec();
        self.ranked(&query_vector, top_k, None, Some(position))
    }

    /// Ordered per-document summaries of the loaded corpus.
    pub fn list_documents(&self) -> Vec<DocumentSummary> {
        let mut documents = self.corpus.documents().to_vec();
        documents.sort_by(|a, b| a.document_name.cmp(&b.document_name));
        documents
    }

    pub fn status(&self) -> CorpusStatus {
        CorpusStatus {
            ready: self.corpus.chunk_count() > 0,
            total_chunks: self.corpus.chunk_count(),
            total_documents: self.corpus.document_count(),
        }
    }

    fn check_args(&self, query_text: &str, top_k: usize) -> Result<(), SearchError> {
        if top_k == 0 {
            return Err(SearchError::InvalidArgument(
                "top_k must be positive".to_string(),
            ));
        }
        if query_text.trim().is_empty() {
            return Err(SearchError::InvalidArgument(
                "query text must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn check_ready(&self) -> Result<(), SearchError> {
        if self.corpus.chunk_count() == 0 || self.corpus.index().is_empty() {
            return Err(SearchError::NotReady);
        }
        Ok(())
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        if self.embedder.dimension() != self.corpus.index().dimension() {
            return Err(SearchError::Dependency(format!(
                "embedder dimension {} does not match corpus dimension {}",
                self.embedder.dimension(),
                self.corpus.index().dimension()
            )));
        }
        Ok(self.embedder.embed(text)?)
    }

    /// Shared ranking pipeline: overfetch, resolve, normalize, filter,
    /// dedup, order, truncate.
    fn ranked(
        &self,
        query_vector: &[f32],
        top_k: usize,
        document_filter: Option<&str>,
        exclude_position: Option<usize>,
    ) -> Result<Vec<SearchResult>, SearchError> {
        // A document filter or exclusion can eat arbitrarily many
        // candidates, so fetch the whole corpus in those cases; plain
        // queries overfetch to absorb dedup losses.
        let fetch = if document_filter.is_some() || exclude_position.is_some() {
            self.corpus.chunk_count()
        } else {
            top_k
                .saturating_mul(self.overfetch_factor)
                .min(self.corpus.chunk_count())
        };

        let candidates = self.corpus.index().search(query_vector, fetch)?;

        let mut scored: Vec<(&Chunk, f32)> = Vec::with_capacity(candidates.len());
        for (position, cosine) in candidates {
            if exclude_position == Some(position) {
                continue;
            }
            let chunk = self.corpus.chunk(position).ok_or_else(|| {
                SearchError::Dependency(format!(
                    "index returned position {position} beyond corpus size {}",
                    self.corpus.chunk_count()
                ))
            })?;
            if let Some(filter) = document_filter {
                if chunk.document_name != filter {
                    continue;
                }
            }
            scored.push((chunk, normalize_score(cosine)));
        }

        // Deterministic order before dedup so the kept representative of a
        // duplicate group is always the same chunk.
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    (&a.0.document_name, a.0.page_number, a.0.sequence_index).cmp(&(
                        &b.0.document_name,
                        b.0.page_number,
                        b.0.sequence_index,
                    ))
                })
        });

        let mut results: Vec<SearchResult> = Vec::with_capacity(top_k);
        let mut kept: Vec<&Chunk> = Vec::new();
        for (chunk, score) in scored {
            let duplicate = kept.iter().any(|k| {
                k.document_name == chunk.document_name
                    && k.page_number == chunk.page_number
                    && word_overlap(&k.text, &chunk.text) > self.dedup_overlap
            });
            if duplicate {
                continue;
            }
            kept.push(chunk);
            results.push(SearchResult {
                chunk_id: chunk.chunk_id.clone(),
                similarity_score: score,
                document_name: chunk.document_name.clone(),
                page_number: chunk.page_number,
                section_title: chunk.section_title.clone(),
                text: chunk.text.clone(),
            });
            if results.len() == top_k {
                break;
            }
        }
        Ok(results)
    }
}

/// The one fixed mapping from raw index cosine to the caller-visible
/// similarity scale.
fn normalize_score(cosine: f32) -> f32 {
    ((cosine + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Word-set Jaccard overlap, case-insensitive.
fn word_overlap(a: &str, b: &str) -> f32 {
    let set_a: HashSet<String> = a.split_whitespace().map(str::to_lowercase).collect();
    let set_b: HashSet<String> = b.split_whitespace().map(str::to_lowercase).collect();
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.len() + set_b.len() - intersection;
    intersection as f32 / union as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{build_corpus, CorpusHandle};
    use crate::embed::NgramEmbedder;
    use crate::index::FlatIndex;
    use crate::loader::{DocumentFormat, DocumentSource};

    fn source(name: &str, text: &str) -> DocumentSource {
        DocumentSource::from_bytes(name, DocumentFormat::Text, text.as_bytes().to_vec())
    }

    fn test_config() -> RetrievalConfig {
        let mut config = RetrievalConfig::default();
        config.chunking.window_words = 30;
        config.chunking.stride_words = 25;
        config.chunking.min_chunk_words = 3;
        config
    }

    fn toy_corpus(dir: &std::path::Path, embedder: &NgramEmbedder) -> CorpusHandle {
        let sources = vec![
            source(
                "afib_2024",
                "ATRIAL FIBRILLATION\nAtrial fibrillation management uses rate control, \
                 rhythm control, and anticoagulation to reduce stroke risk in patients.",
            ),
            source(
                "htn_2024",
                "HYPERTENSION\nHypertension management targets blood pressure reduction \
                 with lifestyle changes and antihypertensive drug treatment for patients.",
            ),
        ];
        let (handle, _) = build_corpus(&sources, embedder, &test_config(), dir).unwrap();
        handle
    }

    fn empty_handle() -> CorpusHandle {
        CorpusHandle::new(
            Vec::new(),
            Vec::new(),
            FlatIndex::build(NgramEmbedder::DEFAULT_DIMENSION, &[]).unwrap(),
            "char-ngram-v1".to_string(),
        )
    }

    #[test]
    fn empty_query_is_invalid() {
        let embedder = NgramEmbedder::default();
        let handle = empty_handle();
        let engine = SearchEngine::new(&handle, &embedder, &test_config());
        assert!(matches!(
            engine.search("", 5),
            Err(SearchError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.search("   ", 5),
            Err(SearchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn zero_top_k_is_invalid() {
        let embedder = NgramEmbedder::default();
        let handle = empty_handle();
        let engine = SearchEngine::new(&handle, &embedder, &test_config());
        assert!(matches!(
            engine.search("x", 0),
            Err(SearchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn search_before_corpus_is_not_ready() {
        let embedder = NgramEmbedder::default();
        let handle = empty_handle();
        let engine = SearchEngine::new(&handle, &embedder, &test_config());
        assert!(matches!(
            engine.search("valid query", 10),
            Err(SearchError::NotReady)
        ));
        assert!(!engine.status().ready);
    }

    #[test]
    fn end_to_end_ranking_prefers_on_topic_document() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = NgramEmbedder::default();
        let handle = toy_corpus(dir.path(), &embedder);
        let engine = SearchEngine::new(&handle, &embedder, &test_config());

        let results = engine.search("hypertension management", 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_name, "htn_2024");

        // The same query must score strictly higher against the
        // hypertension chunk than against the atrial fibrillation one.
        let all = engine.search("hypertension management", 2).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].similarity_score > all[1].similarity_score);
        assert_eq!(all[1].document_name, "afib_2024");
    }

    #[test]
    fn scores_are_normalized_and_non_increasing() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = NgramEmbedder::default();
        let handle = toy_corpus(dir.path(), &embedder);
        let engine = SearchEngine::new(&handle, &embedder, &test_config());

        let results = engine.search("stroke risk reduction", 10).unwrap();
        assert!(!results.is_empty());
        for pair in results.windows(2) {
            assert!(pair[0].similarity_score >= pair[1].similarity_score);
        }
        for r in &results {
            assert!((0.0..=1.0).contains(&r.similarity_score));
        }
    }

    #[test]
    fn near_duplicate_chunks_collapse() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = NgramEmbedder::default();
        // Stride 5 with window 20 over a 30-word page produces heavily
        // overlapping same-page chunks.
        let mut config = test_config();
        config.chunking.window_words = 20;
        config.chunking.stride_words = 5;
        let text = "hypertension treatment guidance repeated words ".repeat(6);
        let (handle, _) =
            build_corpus(&[source("doc", &text)], &embedder, &config, dir.path()).unwrap();
        let engine = SearchEngine::new(&handle, &embedder, &config);

        let results = engine.search("hypertension treatment", 5).unwrap();
        for (i, a) in results.iter().enumerate() {
            for b in &results[i + 1..] {
                let same_page =
                    a.document_name == b.document_name && a.page_number == b.page_number;
                if same_page {
                    assert!(word_overlap(&a.text, &b.text) <= config.dedup_overlap);
                }
            }
        }
    }

    #[test]
    fn clinical_search_extracts_terms_and_degrades_gracefully() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = NgramEmbedder::default();
        let handle = toy_corpus(dir.path(), &embedder);
        let engine = SearchEngine::new(&handle, &embedder, &test_config());

        let response = engine
            .clinical_search("What are blood pressure targets for diabetic patients?", 2)
            .unwrap();
        assert!(response.terms.iter().any(|t| t == "blood pressure"));
        assert!(response.terms.iter().any(|t| t == "diabetic"));
        assert!(!response.results.is_empty());
        assert_eq!(response.results[0].document_name, "htn_2024");

        // No recognized terms: still a successful plain search.
        let response = engine.clinical_search("management of patients", 2).unwrap();
        assert!(response.terms.is_empty());
        assert!(!response.results.is_empty());
    }

    #[test]
    fn expansion_recalls_canonical_term_at_least_as_well() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = NgramEmbedder::default();
        let handle = toy_corpus(dir.path(), &embedder);
        let engine = SearchEngine::new(&handle, &embedder, &test_config());

        // The corpus says "hypertension", the question says "high blood
        // pressure". Expansion appends the canonical term, so the clinical
        // path must score the hypertension chunk at least as high as the
        // unexpanded query does.
        let question = "treatment options for high blood pressure";
        let plain = engine.search(question, 2).unwrap();
        let clinical = engine.clinical_search(question, 2).unwrap();

        let score_of = |results: &[SearchResult]| {
            results
                .iter()
                .find(|r| r.document_name == "htn_2024")
                .map(|r| r.similarity_score)
                .unwrap_or(0.0)
        };
        assert!(score_of(&clinical.results) >= score_of(&plain));
        assert_eq!(clinical.results[0].document_name, "htn_2024");
    }

    #[test]
    fn document_filter_restricts_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = NgramEmbedder::default();
        let handle = toy_corpus(dir.path(), &embedder);
        let engine = SearchEngine::new(&handle, &embedder, &test_config());

        let results = engine
            .search_in_document("afib_2024", "management of patients", 5)
            .unwrap();
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.document_name == "afib_2024"));

        assert!(matches!(
            engine.search_in_document("missing_doc", "query", 5),
            Err(SearchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn find_similar_excludes_the_probe_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = NgramEmbedder::default();
        let handle = toy_corpus(dir.path(), &embedder);
        let engine = SearchEngine::new(&handle, &embedder, &test_config());

        let probe = handle.chunks()[0].chunk_id.clone();
        let results = engine.find_similar(&probe, 5).unwrap();
        assert!(results.iter().all(|r| r.chunk_id != probe));

        assert!(matches!(
            engine.find_similar("nope", 5),
            Err(SearchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn list_documents_is_ordered_with_counts() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = NgramEmbedder::default();
        let handle = toy_corpus(dir.path(), &embedder);
        let engine = SearchEngine::new(&handle, &embedder, &test_config());

        let documents = engine.list_documents();
        let names: Vec<&str> = documents.iter().map(|d| d.document_name.as_str()).collect();
        assert_eq!(names, vec!["afib_2024", "htn_2024"]);
        assert!(documents.iter().all(|d| d.total_chunks > 0));

        let status = engine.status();
        assert!(status.ready);
        assert_eq!(status.total_documents, 2);
        assert_eq!(
            status.total_chunks,
            documents.iter().map(|d| d.total_chunks as usize).sum::<usize>()
        );
    }

    #[test]
    fn equal_scores_tie_break_by_document_then_position() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = NgramEmbedder::default();
        // Identical text in two documents embeds to identical vectors, so
        // both results carry the same score.
        let text = "hypertension management overview for clinicians";
        let (handle, _) = build_corpus(
            &[source("zeta_doc", text), source("alpha_doc", text)],
            &embedder,
            &test_config(),
            dir.path(),
        )
        .unwrap();
        let engine = SearchEngine::new(&handle, &embedder, &test_config());

        let results = engine.search("hypertension management", 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].similarity_score, results[1].similarity_score);
        assert_eq!(results[0].document_name, "alpha_doc");
        assert_eq!(results[1].document_name, "zeta_doc");
    }

    #[test]
    fn mismatched_embedder_dimension_is_a_dependency_error() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = NgramEmbedder::default();
        let handle = toy_corpus(dir.path(), &embedder);
        let other = NgramEmbedder::new(64);
        let engine = SearchEngine::new(&handle, &other, &test_config());
        assert!(matches!(
            engine.search("hypertension", 3),
            Err(SearchError::Dependency(_))
        ));
    }

    #[test]
    fn every_chunk_is_reachable() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = NgramEmbedder::default();
        let handle = toy_corpus(dir.path(), &embedder);
        assert_eq!(handle.chunk_count(), handle.index().len());

        // Probing the index with each stored vector returns that chunk
        // first: every corpus entry is reachable through the index.
        for (position, chunk) in handle.chunks().iter().enumerate() {
            let vector = handle.index().vector(position).unwrap().to_vec();
            let nearest = handle.index().search(&vector, 1).unwrap();
            assert_eq!(nearest[0].0, position, "chunk {} unreachable", chunk.chunk_id);
        }
    }
}
