//! Guideline document loading.
//!
//! Turns source bytes into per-page cleaned text. Container-level parse
//! failures are fatal to the one document; individual pages that yield no
//! text are tolerated (empty string, logged) so one bad page never sinks a
//! whole guideline.

mod pdf;
mod text;

use std::path::Path;

use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parse error: {0}")]
    Pdf(String),

    #[error("unsupported document format: {0}")]
    Unsupported(String),

    #[error("document has no file name: {0}")]
    InvalidPath(String),
}

/// Source format, inferred from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    /// Plain text or markdown; form feeds (`\x0c`) separate pages.
    Text,
}

/// One document queued for ingestion: identity plus raw bytes.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    /// Corpus-facing name (file stem).
    pub name: String,
    /// Original file name, kept for the document summary.
    pub file_name: String,
    pub format: DocumentFormat,
    pub bytes: Vec<u8>,
}

impl DocumentSource {
    /// Read a source document from disk, inferring its format.
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| LoadError::InvalidPath(path.display().to_string()))?
            .to_string();
        let name = path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or(&file_name)
            .to_string();
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => DocumentFormat::Pdf,
            Some(ext) if ext.eq_ignore_ascii_case("txt") || ext.eq_ignore_ascii_case("md") => {
                DocumentFormat::Text
            }
            other => {
                return Err(LoadError::Unsupported(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };
        let bytes = std::fs::read(path)?;
        Ok(Self {
            name,
            file_name,
            format,
            bytes,
        })
    }

    /// Build a source from in-memory bytes.
    pub fn from_bytes(name: &str, format: DocumentFormat, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            file_name: name.to_string(),
            format,
            bytes,
        }
    }
}

/// Extracted text of one page, already cleaned.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// 1-based page number.
    pub page_number: u32,
    pub text: String,
}

/// Extract the pages of a source document in reading order.
///
/// Pages with no extractable text yield an empty string, not an error.
pub fn load_pages(source: &DocumentSource) -> Result<Vec<PageText>, LoadError> {
    let cleaner = TextCleaner::new();
    let pages = match source.format {
        DocumentFormat::Pdf => pdf::extract_pages(&source.bytes, &cleaner)?,
        DocumentFormat::Text => text::extract_pages(&source.bytes, &cleaner)?,
    };
    log::info!("{}: extracted {} pages", source.name, pages.len());
    Ok(pages)
}

/// Strips the recurring furniture of guideline PDFs (page markers, URLs,
/// DOIs) and collapses runs of spaces, while preserving line structure so
/// the chunker can still detect headings.
pub(crate) struct TextCleaner {
    page_marker: Regex,
    url: Regex,
    doi: Regex,
    spaces: Regex,
}

impl TextCleaner {
    pub(crate) fn new() -> Self {
        Self {
            page_marker: Regex::new(r"(?i)^\s*page\s+\d+\s+of\s+\d+\s*$").unwrap(),
            url: Regex::new(r"https?://\S+").unwrap(),
            doi: Regex::new(r"(?i)doi:\s*\S+").unwrap(),
            spaces: Regex::new(r"[ \t]+").unwrap(),
        }
    }

    pub(crate) fn clean(&self, raw: &str) -> String {
        let mut lines: Vec<String> = Vec::new();
        let mut blank_run = 0usize;
        for line in raw.lines() {
            if self.page_marker.is_match(line) {
                continue;
            }
            let line = self.url.replace_all(line, "");
            let line = self.doi.replace_all(&line, "");
            let line = self.spaces.replace_all(&line, " ");
            let line = line.trim();
            if line.is_empty() {
                blank_run += 1;
                if blank_run > 1 {
                    continue;
                }
            } else {
                blank_run = 0;
            }
            lines.push(line.to_string());
        }
        // Trim leading/trailing blank lines left by the filters.
        while lines.first().is_some_and(|l| l.is_empty()) {
            lines.remove(0);
        }
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }
}
