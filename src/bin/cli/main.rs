mod app;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "guidesearch-cli",
    about = "Build and query a semantic index over clinical guideline documents",
    version
)]
struct Cli {
    /// Directory holding the built corpus artifacts
    #[arg(long, global = true, default_value = "processed_guidelines")]
    corpus: PathBuf,

    /// Optional TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a directory of guideline documents into a corpus
    Build {
        /// Directory containing the source documents (pdf/txt/md)
        source_dir: PathBuf,
    },

    /// Ranked semantic search over the corpus
    Search {
        query: String,
        /// Number of results
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        /// Restrict to one document
        #[arg(long)]
        document: Option<String>,
    },

    /// Clinical-question search with term extraction and query expansion
    Clinical {
        question: String,
        /// Number of results
        #[arg(long, default_value_t = 8)]
        top_k: usize,
    },

    /// Find passages similar to an existing chunk
    Similar {
        chunk_id: String,
        /// Number of results
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },

    /// List the documents in the corpus
    Documents,

    /// Show corpus readiness and counts
    Status,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Command::Build { source_dir } => {
            let app = app::App::new(&cli)?;
            commands::build::run(&app, source_dir, &cli.format)?;
        }
        Command::Search {
            query,
            top_k,
            document,
        } => {
            let app = app::App::with_corpus(&cli)?;
            commands::search::run(&app, query, *top_k, document.as_deref(), &cli.format)?;
        }
        Command::Clinical { question, top_k } => {
            let app = app::App::with_corpus(&cli)?;
            commands::clinical::run(&app, question, *top_k, &cli.format)?;
        }
        Command::Similar { chunk_id, top_k } => {
            let app = app::App::with_corpus(&cli)?;
            commands::similar::run(&app, chunk_id, *top_k, &cli.format)?;
        }
        Command::Documents => {
            let app = app::App::with_corpus(&cli)?;
            commands::documents::run(&app, &cli.format)?;
        }
        Command::Status => {
            let app = app::App::with_corpus(&cli)?;
            commands::status::run(&app, &cli.format)?;
        }
    }

    Ok(())
}
