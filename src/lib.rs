//! RAG Harness - corpus ingestion and LLM-as-judge evaluation for RAG experiments.
//!
//! Two independent pipelines share this crate's config, error and LLM plumbing:
//!
//! 1. **Ingestion**: load a JSON corpus and insert it into an external RAG
//!    indexer, retrying failed inserts under a bounded [`RetryPolicy`].
//! 2. **Evaluation**: ask an LLM judge to compare two answer sets question by
//!    question on Factuality, Comprehensiveness, Diversity and Empowerment,
//!    then aggregate win-rates, optionally averaging over both answer orders.
//!
//! # Quick Start
//!
//! ```no_run
//! use rag_harness::{
//!     config::Config,
//!     eval::{BatchEvaluator, EvalOptions, load_comparison_items},
//!     llm::LlmClient,
//! };
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     config.validate()?;
//!
//!     let items = load_comparison_items(
//!         Path::new("questions.txt"),
//!         Path::new("result_a.json"),
//!         Path::new("result_b.json"),
//!     )?;
//!
//!     let evaluator = BatchEvaluator::new(LlmClient::new(config.llm)?);
//!     let report = evaluator.run(&items, &EvalOptions::default()).await;
//!     report.print_summary();
//!     println!("{}", report.final_scores()?);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Indexer**: seam to the external RAG engine (`HttpIndexer` in production)
//! - **ChatModel**: seam to the judge LLM (`LlmClient` in production)
//! - **RetryPolicy**: max attempts + backoff with an injectable sleeper
//! - **BatchEvaluator**: sequential judge loop, filtering and scoring

pub mod config;
pub mod error;
pub mod eval;
pub mod ingest;
pub mod llm;
pub mod persistence;
pub mod retry;

// Re-export commonly used types
pub use config::Config;
pub use error::{HarnessError, Result};
pub use eval::{BatchEvaluator, EvalOptions, EvalReport, ScoreTable};
pub use ingest::{HttpIndexer, Indexer, Ingestor};
pub use llm::{ChatModel, LlmClient};
pub use retry::{Backoff, RetryOutcome, RetryPolicy, Sleeper, TokioSleeper};

use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber used by the binaries.
///
/// Honours `RUST_LOG`, defaulting to `info`. A second call is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
        tracing::info!("subscriber installed");
    }
}
