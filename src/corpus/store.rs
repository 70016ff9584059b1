//! Durable corpus artifacts.
//!
//! A built corpus is two files in one directory: `corpus.db` (SQLite; one
//! row per chunk in canonical order, one row per document, and a `meta`
//! table recording the embedder identity) and `vectors.bin` (the flat
//! vector index). The row order of `chunks` — by rowid — is the order of
//! record that resolves index positions back to chunks. Writes go to a
//! staging directory first so a crashed build never leaves a half-written
//! pair in place of a good one; loads re-verify that both halves agree.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use thiserror::Error;

use super::models::{Chunk, DocumentSummary};
use crate::embed::EmbedError;
use crate::index::{FlatIndex, IndexError};
use crate::loader::LoadError;

const DB_FILE: &str = "corpus.db";
const VECTORS_FILE: &str = "vectors.bin";
const STAGING_DIR: &str = ".staging";
const SCHEMA_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("vector index error: {0}")]
    Index(#[from] IndexError),

    #[error("embedding error: {0}")]
    Embed(#[from] EmbedError),

    #[error("no corpus artifact at {}", .0.display())]
    NotFound(PathBuf),

    #[error("corpus metadata and vector index disagree: {chunks} chunks vs {vectors} vectors")]
    IndexMismatch { chunks: usize, vectors: usize },

    #[error("build produced no chunks")]
    EmptyCorpus,

    #[error("corrupt corpus metadata: {0}")]
    Corrupt(String),

    #[error("failed to read source directory: {0}")]
    SourceDir(#[from] walkdir::Error),

    #[error("no loadable documents in source directory")]
    NoSources,

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Everything `load_corpus` reads back from disk.
pub(super) struct StoredCorpus {
    pub chunks: Vec<Chunk>,
    pub documents: Vec<DocumentSummary>,
    pub index: FlatIndex,
    pub embedder_id: String,
}

pub struct CorpusStore {
    dir: PathBuf,
}

impl CorpusStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn db_path(&self) -> PathBuf {
        self.dir.join(DB_FILE)
    }

    fn vectors_path(&self) -> PathBuf {
        self.dir.join(VECTORS_FILE)
    }

    pub fn exists(&self) -> bool {
        self.db_path().exists() && self.vectors_path().exists()
    }

    /// Persist a completed build. Artifacts are written into a staging
    /// directory and moved into place afterwards, so readers never open a
    /// metadata table whose vector file is still being written.
    pub fn save(
        &self,
        chunks: &[Chunk],
        documents: &[DocumentSummary],
        index: &FlatIndex,
        embedder_id: &str,
    ) -> Result<(), CorpusError> {
        if chunks.len() != index.len() {
            return Err(CorpusError::IndexMismatch {
                chunks: chunks.len(),
                vectors: index.len(),
            });
        }

        let staging = self.dir.join(STAGING_DIR);
        if staging.exists() {
            std::fs::remove_dir_all(&staging)?;
        }
        std::fs::create_dir_all(&staging)?;

        let staged_db = staging.join(DB_FILE);
        write_metadata(&staged_db, chunks, documents, embedder_id, index.dimension())?;
        let staged_vectors = staging.join(VECTORS_FILE);
        index.save(&staged_vectors)?;

        std::fs::rename(&staged_db, self.db_path())?;
        std::fs::rename(&staged_vectors, self.vectors_path())?;
        std::fs::remove_dir_all(&staging)?;

        log::info!(
            "published corpus at {}: {} chunks, {} documents",
            self.dir.display(),
            chunks.len(),
            documents.len()
        );
        Ok(())
    }

    pub(super) fn load(&self) -> Result<StoredCorpus, CorpusError> {
        if !self.exists() {
            return Err(CorpusError::NotFound(self.dir.clone()));
        }

        let conn = Connection::open(self.db_path())?;

        let schema_version: u32 = read_meta(&conn, "schema_version")?
            .parse()
            .map_err(|_| CorpusError::Corrupt("non-numeric schema_version".into()))?;
        if schema_version != SCHEMA_VERSION {
            return Err(CorpusError::Corrupt(format!(
                "unsupported schema version {schema_version}"
            )));
        }
        let embedder_id = read_meta(&conn, "embedder_id")?;
        let dimension: usize = read_meta(&conn, "dimension")?
            .parse()
            .map_err(|_| CorpusError::Corrupt("non-numeric dimension".into()))?;

        let mut stmt = conn.prepare(
            "SELECT chunk_id, document_name, page_number, section_title, text,
                    sequence_index, word_count, char_count
             FROM chunks ORDER BY rowid",
        )?;
        let chunks = stmt
            .query_map([], |row| {
                Ok(Chunk {
                    chunk_id: row.get(0)?,
                    document_name: row.get(1)?,
                    page_number: row.get(2)?,
                    section_title: row.get(3)?,
                    text: row.get(4)?,
                    sequence_index: row.get(5)?,
                    word_count: row.get(6)?,
                    char_count: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT document_name, file_name, total_pages, total_chunks, processed_at
             FROM documents ORDER BY document_name",
        )?;
        let documents = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
            .into_iter()
            .map(
                |(document_name, file_name, total_pages, total_chunks, processed_at)| {
                    let processed_at = processed_at
                        .parse::<DateTime<Utc>>()
                        .map_err(|e| CorpusError::Corrupt(format!("bad processed_at: {e}")))?;
                    Ok(DocumentSummary {
                        document_name,
                        file_name,
                        total_pages,
                        total_chunks,
                        processed_at,
                    })
                },
            )
            .collect::<Result<Vec<_>, CorpusError>>()?;

        let index = FlatIndex::load(&self.vectors_path())?;
        if index.len() != chunks.len() {
            return Err(CorpusError::IndexMismatch {
                chunks: chunks.len(),
                vectors: index.len(),
            });
        }
        if index.dimension() != dimension {
            return Err(CorpusError::Corrupt(format!(
                "metadata declares dimension {dimension}, vector file has {}",
                index.dimension()
            )));
        }

        log::info!(
            "loaded corpus from {}: {} chunks, {} documents",
            self.dir.display(),
            chunks.len(),
            documents.len()
        );
        Ok(StoredCorpus {
            chunks,
            documents,
            index,
            embedder_id,
        })
    }
}

fn write_metadata(
    db_path: &Path,
    chunks: &[Chunk],
    documents: &[DocumentSummary],
    embedder_id: &str,
    dimension: usize,
) -> Result<(), CorpusError> {
    let mut conn = Connection::open(db_path)?;

    conn.execute_batch(
        r#"
        CREATE TABLE chunks (
            chunk_id TEXT PRIMARY KEY,
            document_name TEXT NOT NULL,
            page_number INTEGER NOT NULL,
            section_title TEXT NOT NULL,
            text TEXT NOT NULL,
            sequence_index INTEGER NOT NULL,
            word_count INTEGER NOT NULL,
            char_count INTEGER NOT NULL
        );

        CREATE TABLE documents (
            document_name TEXT PRIMARY KEY,
            file_name TEXT NOT NULL,
            total_pages INTEGER NOT NULL,
            total_chunks INTEGER NOT NULL,
            processed_at TEXT NOT NULL
        );

        CREATE TABLE meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX idx_chunks_document ON chunks(document_name);
        "#,
    )?;

    let tx = conn.transaction()?;
    for chunk in chunks {
        tx.execute(
            "INSERT INTO chunks (chunk_id, document_name, page_number, section_title,
                                 text, sequence_index, word_count, char_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                chunk.chunk_id,
                chunk.document_name,
                chunk.page_number,
                chunk.section_title,
                chunk.text,
                chunk.sequence_index,
                chunk.word_count,
                chunk.char_count,
            ],
        )?;
    }
    for doc in documents {
        tx.execute(
            "INSERT INTO documents (document_name, file_name, total_pages, total_chunks, processed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                doc.document_name,
                doc.file_name,
                doc.total_pages,
                doc.total_chunks,
                doc.processed_at.to_rfc3339(),
            ],
        )?;
    }
    for (key, value) in [
        ("schema_version", SCHEMA_VERSION.to_string()),
        ("embedder_id", embedder_id.to_string()),
        ("dimension", dimension.to_string()),
    ] {
        tx.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
    }
    tx.commit()?;
    Ok(())
}

fn read_meta(conn: &Connection, key: &str) -> Result<String, CorpusError> {
    conn.query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
        row.get::<_, String>(0)
    })
    .map_err(|_| CorpusError::Corrupt(format!("missing meta key '{key}'")))
}
