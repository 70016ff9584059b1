use std::path::Path;

use anyhow::{Context, Result};

use guidesearch::{build_corpus, discover_sources};

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, source_dir: &Path, format: &OutputFormat) -> Result<()> {
    let sources = discover_sources(source_dir).with_context(|| {
        format!("Failed to discover documents in {}", source_dir.display())
    })?;

    let (handle, report) = build_corpus(
        &sources,
        app.embedder.as_ref(),
        &app.config,
        &app.corpus_dir,
    )
    .context("Corpus build failed")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Plain => {
            println!(
                "Built corpus at {}: {} chunks from {} documents",
                app.corpus_dir.display(),
                handle.chunk_count(),
                report.documents.len()
            );
            for doc in &report.documents {
                println!(
                    "  - {}: {} pages, {} chunks",
                    doc.document_name, doc.total_pages, doc.total_chunks
                );
            }
            if !report.skipped.is_empty() {
                println!("Skipped {} document(s):", report.skipped.len());
                for skipped in &report.skipped {
                    println!("  - {}: {}", skipped.name, skipped.reason);
                }
            }
        }
    }

    Ok(())
}
