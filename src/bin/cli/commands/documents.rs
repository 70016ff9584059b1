use anyhow::Result;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat) -> Result<()> {
    let engine = app.engine()?;
    let documents = engine.list_documents();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&documents)?);
        }
        OutputFormat::Plain => {
            if documents.is_empty() {
                println!("No documents in corpus.");
                return Ok(());
            }
            for doc in &documents {
                println!(
                    "{} ({}): {} pages, {} chunks, processed {}",
                    doc.document_name,
                    doc.file_name,
                    doc.total_pages,
                    doc.total_chunks,
                    doc.processed_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
    }
    Ok(())
}
