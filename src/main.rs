//! RAG Harness CLI
//!
//! Corpus ingestion with bounded retries, offline re-scoring of saved
//! evaluations, and an LLM connectivity check. Pairwise judging itself
//! lives in the `qualeval` binary.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rag_harness::{
    config::Config,
    init_tracing,
    eval::{EvaluationRecord, score_records},
    ingest::{HttpIndexer, Ingestor, class_corpus_path},
    llm::LlmClient,
    persistence::{load_json, save_json},
    retry::{RetryOutcome, RetryPolicy},
};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// RAG Harness - ingestion driver and evaluation utilities
#[derive(Parser)]
#[command(name = "rag-harness")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Explicit config file (defaults to the per-user config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert a JSON corpus into the RAG indexer, retrying on failure
    Ingest {
        /// Corpus file; defaults to <dataset-root>/unique_contexts/<class>_unique_contexts.json
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Dataset class; locates the corpus and, unless set elsewhere, the working directory
        #[arg(long, default_value = "sample")]
        class: String,

        /// Root of the dataset tree
        #[arg(long, default_value = "datasets/ultradoman")]
        dataset_root: PathBuf,

        /// Indexer working directory (overrides config; defaults to expr/ultradoman/<class>)
        #[arg(long)]
        working_dir: Option<PathBuf>,

        /// Indexer service URL (overrides config)
        #[arg(long)]
        endpoint: Option<String>,

        /// Total insert attempts (overrides config)
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Seconds to wait between attempts (overrides config)
        #[arg(long)]
        retry_delay_secs: Option<u64>,
    },

    /// Re-score a saved evaluation file without calling the LLM
    Score {
        /// Evaluation records written by `qualeval`
        records: PathBuf,

        /// Write the score table here as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Test LLM connection
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest {
            corpus,
            class,
            dataset_root,
            working_dir,
            endpoint,
            max_attempts,
            retry_delay_secs,
        } => {
            let mut config =
                Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
            if let Some(dir) = working_dir {
                config.indexer.working_dir = Some(dir);
            }
            config.indexer = config.indexer.for_class(&class);
            if let Some(endpoint) = endpoint {
                config.indexer.endpoint = endpoint;
            }
            if let Some(n) = max_attempts {
                config.retry.max_attempts = n;
            }
            if let Some(secs) = retry_delay_secs {
                config.retry.delay_secs = secs;
            }
            let corpus = corpus.unwrap_or_else(|| class_corpus_path(&dataset_root, &class));
            cmd_ingest(config, corpus).await
        }
        Commands::Score { records, output } => cmd_score(records, output),
        Commands::Test => cmd_test(cli.config).await,
    }
}

async fn cmd_ingest(config: Config, corpus: PathBuf) -> Result<()> {
    config.validate_indexer().context("Invalid configuration")?;

    let start = Instant::now();
    let policy = RetryPolicy::from(&config.retry);
    let indexer = HttpIndexer::new(config.indexer).context("Failed to prepare indexer")?;

    info!(
        corpus = %corpus.display(),
        working_dir = %indexer.working_dir().display(),
        endpoint = %indexer.config().endpoint,
        "ingesting corpus"
    );
    let ingestor = Ingestor::new(indexer, policy);

    let outcome = ingestor
        .insert_file(&corpus)
        .await
        .context("Failed to load corpus")?;

    match outcome {
        RetryOutcome::Succeeded { attempts } => {
            println!(
                "Corpus inserted in {:.2?} ({} attempt{})",
                start.elapsed(),
                attempts,
                if attempts == 1 { "" } else { "s" }
            );
            Ok(())
        }
        RetryOutcome::Exhausted {
            attempts,
            last_error,
        } => {
            anyhow::bail!(
                "Insertion failed after {} attempts in {:.2?}: {}",
                attempts,
                start.elapsed(),
                last_error
            )
        }
    }
}

fn cmd_score(records_path: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let records: Vec<EvaluationRecord> =
        load_json(&records_path).context("Failed to load evaluation records")?;
    let total = records.len();

    let (scores, discarded) = score_records(&records).context("Failed to score evaluations")?;

    println!(
        "Scored {} of {} evaluations ({} discarded)\n",
        total - discarded,
        total,
        discarded
    );
    print!("{}", scores);

    if let Some(path) = output {
        save_json(&scores, &path).context("Failed to save scores")?;
        println!("\nScores saved to {}", path.display());
    }

    Ok(())
}

async fn cmd_test(config_path: Option<PathBuf>) -> Result<()> {
    println!("Testing LLM connection...\n");

    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    println!("Configuration:");
    println!("  API Base:  {}", config.llm.api_base);
    println!("  Model:     {}", config.llm.model);
    println!(
        "  API Key:   {}...",
        config.llm.api_key.chars().take(8).collect::<String>()
    );
    println!();

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Ok(());
    }

    let client = LlmClient::new(config.llm)?;

    println!("Sending test request...");
    match client.test_connection().await {
        Ok(()) => {
            println!("Connection successful!");
        }
        Err(e) => {
            println!("Connection failed: {}", e);
        }
    }

    Ok(())
}
