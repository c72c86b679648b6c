//! RAG benchmark CLI: replay a query suite against `/api/rag/query` and report
//! Hit@K, Recall@K, MRR, nDCG@K and latency percentiles.

use anyhow::Result;
use clap::Parser;
use ragbench::bench::write_reports;
use ragbench::{RunOptions, Runner, SuiteConfig, SuiteResult};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ragbench", version)]
struct Args {
    /// Path to the query suite YAML.
    #[arg(long = "in", default_value = "queries.yaml")]
    input: PathBuf,

    /// Override the API base from the suite file.
    #[arg(long)]
    api: Option<String>,

    /// Override K from the suite file (ignored unless > 0).
    #[arg(long)]
    k: Option<i64>,

    /// Output Markdown report.
    #[arg(long, default_value = "report.md")]
    out: PathBuf,

    /// Optional JSON report path.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Maximum concurrent queries.
    #[arg(long, default_value_t = 16, allow_negative_numbers = true)]
    parallel: i64,

    /// Per-request timeout in milliseconds.
    #[arg(long = "timeout-ms", alias = "timeout_ms", default_value_t = 8000, allow_negative_numbers = true)]
    timeout_ms: i64,

    /// Fail (exit 1) if Hit@K is below this ratio.
    #[arg(long)]
    min_hit_at_k: Option<f64>,

    /// Fail (exit 1) if MRR is below this value.
    #[arg(long)]
    min_mrr: Option<f64>,
}

/// Names of the quality gates the result does not meet.
fn failed_gates(args: &Args, result: &SuiteResult) -> Vec<String> {
    let mut failed = Vec::new();
    if let Some(min) = args.min_hit_at_k {
        if result.metrics.hit_at_k < min {
            failed.push(format!("Hit@K {:.4} < {:.4}", result.metrics.hit_at_k, min));
        }
    }
    if let Some(min) = args.min_mrr {
        if result.metrics.mrr < min {
            failed.push(format!("MRR {:.4} < {:.4}", result.metrics.mrr, min));
        }
    }
    failed
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let args = Args::parse();

    let mut config = SuiteConfig::load(&args.input)?;
    config.apply_overrides(args.api.clone(), args.k);
    config.validate()?;
    let k = config.k();
    log::info!("Loaded {} queries from {}", config.queries.len(), args.input.display());

    let runner = Runner::new(&config.api_base, RunOptions::new(args.parallel, args.timeout_ms))?;
    let result = runner.run(&config.cases(), k).await;

    write_reports(&config, &result, &args.out, args.json.as_deref())?;

    println!("RAG benchmark done. Report: {}", args.out.display());
    println!(
        "Hit@{k}: {:.2}%  Recall@{k}: {:.2}%  MRR: {:.4}  nDCG@{k}: {:.4}  P95: {}ms  Errors: {}",
        100.0 * result.metrics.hit_at_k,
        100.0 * result.metrics.recall_at_k,
        result.metrics.mrr,
        result.metrics.ndcg_at_k,
        result.latency.p95,
        result.errors,
        k = k
    );

    let failed = failed_gates(&args, &result);
    if !failed.is_empty() {
        println!("\nQuality gates not met: {}", failed.join("; "));
        std::process::exit(1);
    }

    Ok(())
}
