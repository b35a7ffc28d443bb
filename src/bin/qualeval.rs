//! Pairwise answer evaluation with an LLM judge.
//!
//! Usage:
//!   qualeval                                  # Run on the default hypertension dataset
//!   qualeval --query_file <q.txt> --result1_file <a.json> --result2_file <b.json>
//!
//! Options:
//!   --output_file_path <path>   # Judged records (swapped pass gets a `_swapped` suffix)
//!   --output_score_path <path>  # Final win-rate table
//!   --single_pass               # Skip the swapped-order pass
//!   --config <path>             # Explicit config file

use anyhow::{Context, Result};
use clap::Parser;
use rag_harness::config::Config;
use rag_harness::init_tracing;
use rag_harness::eval::{BatchEvaluator, EvalOptions, load_comparison_items};
use rag_harness::llm::LlmClient;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "qualeval")]
#[command(about = "Compare two answer sets with an LLM judge", long_about = None)]
struct Cli {
    /// Question list, one `- Question N: <text>` per line
    #[arg(
        long = "query_file",
        default_value = "datasets/ultradoman/questions/hypertension_questions.txt"
    )]
    query_file: PathBuf,

    /// First answer set (JSON array of objects with a `result` field)
    #[arg(
        long = "result1_file",
        default_value = "output_qual/ultradoman/hypertension/hypertension_result.json"
    )]
    result1_file: PathBuf,

    /// Second answer set
    #[arg(
        long = "result2_file",
        default_value = "others/LightRAG/output_qual/ultradoman/hypertension/hypertension_result.json"
    )]
    result2_file: PathBuf,

    /// Where to write the judged records
    #[arg(
        long = "output_file_path",
        default_value = "output_qual/ultradoman/hypertension/batch_eval.jsonl"
    )]
    output_file_path: PathBuf,

    /// Where to write the score table
    #[arg(
        long = "output_score_path",
        default_value = "output_qual/ultradoman/hypertension/batch_eval_scores.json"
    )]
    output_score_path: PathBuf,

    /// Judge only in the given order (no position-bias correction)
    #[arg(long = "single_pass")]
    single_pass: bool,

    /// Explicit config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(api_base = %config.llm.api_base, model = %config.llm.model, "judge configured");

    let items = load_comparison_items(&cli.query_file, &cli.result1_file, &cli.result2_file)
        .context("Failed to load evaluation inputs")?;
    println!("Loaded {} questions", items.len());

    let client = LlmClient::new(config.llm).context("Failed to create LLM client")?;
    let evaluator = BatchEvaluator::new(client);
    let options = EvalOptions {
        symmetric: !cli.single_pass,
    };

    let report = evaluator.run(&items, &options).await;
    report.print_summary();

    report
        .save_records(&cli.output_file_path)
        .context("Failed to save evaluations")?;
    println!(
        "All evaluations saved to {}",
        cli.output_file_path.display()
    );

    report
        .save_scores(&cli.output_score_path)
        .context("Failed to save scores")?;
    println!("All scores saved to {}", cli.output_score_path.display());

    Ok(())
}
