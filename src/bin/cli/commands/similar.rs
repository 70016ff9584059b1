use anyhow::Result;

use crate::app::App;
use crate::OutputFormat;

use super::search::print_results;

pub fn run(app: &App, chunk_id: &str, top_k: usize, format: &OutputFormat) -> Result<()> {
    let engine = app.engine()?;
    let results = engine.find_similar(chunk_id, top_k)?;
    print_results(&results, format)
}
