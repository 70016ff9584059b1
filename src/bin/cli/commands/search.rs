use anyhow::Result;

use guidesearch::SearchResult;

use crate::app::App;
use crate::OutputFormat;

pub fn run(
    app: &App,
    query: &str,
    top_k: usize,
    document: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    let engine = app.engine()?;
    let results = match document {
        Some(name) => engine.search_in_document(name, query, top_k)?,
        None => engine.search(query, top_k)?,
    };

    print_results(&results, format)
}

pub fn print_results(results: &[SearchResult], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results)?);
        }
        OutputFormat::Plain => {
            if results.is_empty() {
                println!("No results.");
                return Ok(());
            }
            for (rank, result) in results.iter().enumerate() {
                println!(
                    "{}. {} (page {}) score {:.3}",
                    rank + 1,
                    result.document_name,
                    result.page_number,
                    result.similarity_score
                );
                if !result.section_title.is_empty() {
                    println!("   Section: {}", result.section_title);
                }
                println!("   {}", excerpt(&result.text, 300));
                println!();
            }
        }
    }
    Ok(())
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}
