use std::path::PathBuf;

use anyhow::{Context, Result};

use guidesearch::{embed, load_corpus, CorpusHandle, Embedder, RetrievalConfig, SearchEngine};

/// Shared state for CLI commands: configuration, embedder, and (for query
/// commands) the loaded corpus.
pub struct App {
    pub config: RetrievalConfig,
    pub corpus_dir: PathBuf,
    pub embedder: Box<dyn Embedder>,
    pub corpus: Option<CorpusHandle>,
}

impl App {
    /// Initialize without loading a corpus (used by `build`).
    pub fn new(cli: &crate::Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => RetrievalConfig::from_toml_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => RetrievalConfig::default(),
        };
        let embedder =
            embed::from_config(&config.embedding).context("Failed to initialize embedder")?;

        Ok(Self {
            config,
            corpus_dir: cli.corpus.clone(),
            embedder,
            corpus: None,
        })
    }

    /// Initialize and load the corpus artifacts (used by query commands).
    pub fn with_corpus(cli: &crate::Cli) -> Result<Self> {
        let mut app = Self::new(cli)?;
        let corpus = load_corpus(&app.corpus_dir).with_context(|| {
            format!(
                "Failed to load corpus from {}. Run `build` first.",
                app.corpus_dir.display()
            )
        })?;
        app.corpus = Some(corpus);
        Ok(app)
    }

    pub fn engine(&self) -> Result<SearchEngine<'_>> {
        let corpus = self
            .corpus
            .as_ref()
            .context("No corpus loaded")?;
        Ok(SearchEngine::new(corpus, self.embedder.as_ref(), &self.config))
    }
}
