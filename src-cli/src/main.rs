//! SportExpert CLI
//!
//! ```bash
//! # Build (or rebuild) the evidence index from the knowledge base
//! sportexpert ingest --force
//!
//! # Ask a question
//! sportexpert ask "What is LBW in cricket?"
//!
//! # Inspect retrieval directly
//! sportexpert search "tiebreak rules" -k 5
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sx_ai::evidence::{load_or_build, EvidenceHandle, EvidenceInit, IndexStore, Retrieval};
use sx_ai::ollama::OllamaClient;
use sx_ai::pipeline::Coordinator;
use sx_core::config::Settings;
use sx_core::error::{AppError, ErrorKind};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sportexpert")]
#[command(about = "Answers tennis, cricket and outdoor sports questions with cited sources")]
#[command(version)]
struct Cli {
    /// Directory holding the source documents (overrides SX_KNOWLEDGE_BASE_DIR)
    #[arg(long, global = true)]
    kb_dir: Option<PathBuf>,

    /// Directory for the persisted index (overrides SX_INDEX_DIR)
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    /// Number of evidence chunks to retrieve (overrides SX_TOP_K)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..=50))]
    top_k: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question
    Ask {
        /// The question; multiple words are joined with spaces
        #[arg(trailing_var_arg = true)]
        query: Vec<String>,

        /// Print the full answer record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the evidence index from the knowledge base
    Ingest {
        /// Rebuild even when a persisted index exists
        #[arg(short, long)]
        force: bool,
    },

    /// Print the persisted index status as JSON
    Status,

    /// Query the evidence index directly
    Search {
        query: String,

        #[arg(short, default_value = "3")]
        k: u32,
    },

    /// Check that the local Ollama server is reachable
    Health,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            let kind = error_kind(&e);
            if let Some(hint) = kind.hint() {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(kind.exit_code())
        }
    }
}

/// Kind of the first [`AppError`] in the chain; context layers are skipped.
fn error_kind(err: &anyhow::Error) -> ErrorKind {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<AppError>())
        .map(AppError::kind)
        .unwrap_or(ErrorKind::Other)
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::from_env().context("loading settings")?;
    if let Some(dir) = cli.kb_dir {
        settings.knowledge_base_dir = dir;
    }
    if let Some(dir) = cli.index_dir {
        settings.index_dir = dir;
    }
    if let Some(k) = cli.top_k {
        settings.top_k = k;
    }

    match cli.command {
        Commands::Ask { query, json } => {
            let evidence = EvidenceHandle::new();
            let init = EvidenceInit::from_settings(&settings, false)?;
            let loader = evidence.spawn_initialization(init);
            if loader.join().is_err() {
                tracing::error!("Evidence initialization thread panicked");
            }

            let coordinator = Coordinator::from_settings(&settings, evidence)?;
            let answer = coordinator.ask(&query.join(" "))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                println!("{}", answer.text);
            }
        }

        Commands::Ingest { force } => {
            let init = EvidenceInit::from_settings(&settings, force)?;
            let index = load_or_build(&init)?;
            let status = index.status();
            info!(chunks = status.chunk_count, "Index ready");
            println!(
                "Indexed {} chunks from {} documents into {}",
                status.chunk_count,
                status.sources.len(),
                settings.index_dir.display()
            );
        }

        Commands::Status => {
            let status = IndexStore::open(settings.index_dir.clone()).status()?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }

        Commands::Search { query, k } => {
            let evidence = EvidenceHandle::new();
            evidence.initialize(&EvidenceInit::from_settings(&settings, false)?)?;
            let hits = match evidence.query(&query, k)? {
                Retrieval::Hits(hits) => hits,
                Retrieval::NotInitialized => anyhow::bail!("evidence index is not initialized"),
            };

            println!("=== {} results for '{query}' ===\n", hits.len());
            for (i, hit) in hits.iter().enumerate() {
                println!(
                    "#{} {} [ordinal {}] (score: {:.4})",
                    i + 1,
                    hit.chunk.source_name,
                    hit.chunk.ordinal,
                    hit.score
                );
                let preview: String = hit.chunk.text.chars().take(300).collect();
                let ellipsis = if hit.chunk.text.chars().count() > 300 { "..." } else { "" };
                println!("{preview}{ellipsis}\n");
            }
        }

        Commands::Health => {
            let client = OllamaClient::new(&settings.ollama_base_url)?;
            client.health_check()?;
            println!("Ollama reachable on {}", client.base_url());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sx_core::error::codes;

    #[test]
    fn app_error_behind_context_sets_the_exit_code() {
        let err = anyhow::Error::new(AppError::new(codes::INDEX_IO_FAILED, "Failed to read index"))
            .context("loading index");
        assert_eq!(error_kind(&err), ErrorKind::Storage);
        assert_eq!(error_kind(&err).exit_code(), 4);

        let plain = anyhow::anyhow!("evidence index is not initialized");
        assert_eq!(error_kind(&plain).exit_code(), 1);
    }
}
