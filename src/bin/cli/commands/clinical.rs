use anyhow::Result;

use crate::app::App;
use crate::OutputFormat;

use super::search::print_results;

pub fn run(app: &App, question: &str, top_k: usize, format: &OutputFormat) -> Result<()> {
    let engine = app.engine()?;
    let response = engine.clinical_search(question, top_k)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Plain => {
            if response.terms.is_empty() {
                println!("No clinical terms recognized.");
            } else {
                println!("Clinical terms: {}", response.terms.join(", "));
            }
            println!();
            print_results(&response.results, format)?;
        }
    }
    Ok(())
}
