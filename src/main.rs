use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod catalog;
mod cli;
mod config;
mod filter;
mod providers;
mod semantic;
mod service;

use catalog::{Catalog, Locale};
use config::Config;
use filter::{CardFilter, ParsedQuery};
use providers::openai::OpenAiClient;
use semantic::{EmbeddingCache, EmbeddingStore, FileEmbeddingStore, HttpEmbeddingStore};
use service::SearchService;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_store(config: &Config) -> Result<Arc<dyn EmbeddingStore>> {
    let dimensions = config.embeddings.dimensions;
    if config.embeddings.is_remote() {
        let timeout = Duration::from_secs(config.llm.timeout_secs);
        let store = HttpEmbeddingStore::new(&config.embeddings.source, dimensions, timeout)?;
        Ok(Arc::new(store))
    } else {
        Ok(Arc::new(FileEmbeddingStore::new(
            config.embeddings_dir(),
            dimensions,
        )))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let args = cli::Args::parse();
    let config = Config::load()?;
    let locale: Locale = args.locale.unwrap_or(config.default_locale);
    let cache = Arc::new(EmbeddingCache::new(build_store(&config)?));

    match args.command {
        cli::Command::Warm {} => {
            let table = cache.get(locale).await?;
            println!(
                "loaded {} {} embeddings ({} dimensions)",
                table.len(),
                locale,
                table.dimensions()
            );
        }

        cli::Command::Search {
            query,
            filters,
            no_llm,
            limit,
        } => {
            let catalog_path = config.catalog_path();
            let catalog = Catalog::load(&catalog_path)
                .with_context(|| format!("failed to load {}", catalog_path.display()))?;
            if catalog.is_empty() {
                log::warn!("{} contains no cards", catalog_path.display());
            }

            let mut search_config = config.search.clone();
            if let Some(limit) = limit {
                search_config.max_results = Some(limit);
            }

            let mut service =
                SearchService::new(Arc::new(catalog), search_config).with_embeddings(cache);
            if config.llm.enabled && !no_llm {
                let client = Arc::new(OpenAiClient::new(
                    &config.llm,
                    config.embeddings.dimensions,
                )?);
                service = service
                    .with_parser(client.clone())
                    .with_embedder(client.clone())
                    .with_answerer(client);
            }

            let raw = query.join(" ");
            let outcome = match filters {
                Some(json) => {
                    let filters: CardFilter =
                        serde_json::from_str(&json).context("--filters is not a valid filter object")?;
                    let parsed = ParsedQuery {
                        filters,
                        semantic_query: Some(raw.clone()),
                    };
                    service.search_parsed(&raw, parsed, locale).await
                }
                None => service.search(&raw, locale).await,
            };

            tracing::debug!(
                mode = ?outcome.mode,
                candidates = outcome.candidates.len(),
                results = outcome.results.len(),
                "search finished"
            );
            for degradation in &outcome.degradations {
                eprintln!("note: {degradation}");
            }
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}
