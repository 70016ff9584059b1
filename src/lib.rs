//! Semantic retrieval core for clinical guideline documents.
//!
//! The pipeline: per-page text extraction ([`loader`]), overlapping passage
//! chunking with document/page/section tracking ([`chunker`]), embedding
//! ([`embed`]), exact cosine vector index with file persistence
//! ([`index`]), durable corpus artifacts ([`corpus`]), and query-time
//! ranked retrieval with clinical term extraction ([`retrieval`],
//! [`terms`]).
//!
//! Build offline with [`corpus::build_corpus`], serve with
//! [`corpus::load_corpus`] + [`retrieval::SearchEngine`]. Loaded corpora
//! are immutable; a rebuild replaces the on-disk artifact pair as a whole.

pub mod chunker;
pub mod config;
pub mod corpus;
pub mod embed;
pub mod index;
pub mod loader;
pub mod retrieval;
pub mod terms;

pub use config::RetrievalConfig;
pub use corpus::{
    build_corpus, discover_sources, load_corpus, CorpusError, CorpusHandle, CorpusStatus,
    DocumentSummary, IngestionReport,
};
pub use embed::{Embedder, HttpEmbedder, NgramEmbedder};
pub use loader::{DocumentFormat, DocumentSource, LoadError};
pub use retrieval::{ClinicalSearchResponse, SearchEngine, SearchError, SearchResult};
pub use terms::ClinicalTermExtractor;
