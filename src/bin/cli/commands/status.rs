use anyhow::Result;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat) -> Result<()> {
    let engine = app.engine()?;
    let status = engine.status();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        OutputFormat::Plain => {
            println!(
                "ready: {} ({} chunks, {} documents)",
                status.ready, status.total_chunks, status.total_documents
            );
        }
    }
    Ok(())
}
