//! Report rendering: deterministic Markdown for humans and JSON for tooling.

use super::metrics::case_hit_at_k;
use super::{LatencyStats, Metrics, SuiteResult};
use crate::config::SuiteConfig;
use crate::error::{ErrorKind, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

/// Upper bound on error message length in the failures table.
const FAILURE_MESSAGE_CHARS: usize = 180;

/// Keep a value inside a single Markdown table cell.
fn escape_cell(s: &str) -> String {
    s.replace(['\r', '\n'], " ").replace('|', "\\|")
}

/// Escape for a table cell, then clip to at most `max` characters, marking
/// the cut with "...". An escaped `\|` is never split.
fn clip_cell(s: &str, max: usize) -> String {
    let escaped = escape_cell(s);
    if escaped.chars().count() <= max {
        return escaped;
    }
    let budget = max.saturating_sub(3);
    let mut out = String::with_capacity(budget + 3);
    let mut used = 0;
    for c in s.chars() {
        let width = if c == '|' { 2 } else { 1 };
        if used + width > budget {
            break;
        }
        match c {
            '|' => out.push_str("\\|"),
            '\r' | '\n' => out.push(' '),
            _ => out.push(c),
        }
        used += width;
    }
    out.push_str("...");
    out
}

/// Render the Markdown report. Same input, same bytes.
pub fn render_markdown(config: &SuiteConfig, result: &SuiteResult) -> String {
    let k = config.k();
    let m = &result.metrics;
    let mut md = String::new();

    // `write!` into a String cannot fail.
    let _ = writeln!(md, "# RAG Benchmark Report\n");
    let _ = writeln!(
        md,
        "- API: `{}`\n- K: `{}`\n- Cases: `{}`\n- Errors: `{}`\n- Eligible: `{}`\n",
        config.api_base,
        k,
        result.cases.len(),
        result.errors,
        result.eligible
    );

    let _ = writeln!(md, "## Summary Metrics\n");
    let _ = writeln!(md, "| Metric | Value |\n|---|---|");
    let _ = writeln!(md, "| Hit@{} | {:.2}% |", k, 100.0 * m.hit_at_k);
    let _ = writeln!(md, "| Recall@{} | {:.2}% |", k, 100.0 * m.recall_at_k);
    let _ = writeln!(md, "| MRR | {:.4} |", m.mrr);
    let _ = writeln!(md, "| nDCG@{} | {:.4} |", k, m.ndcg_at_k);
    let _ = writeln!(md, "| P50 latency | {} ms |", result.latency.p50);
    let _ = writeln!(md, "| P95 latency | {} ms |\n", result.latency.p95);

    if result.errors > 0 {
        let _ = writeln!(md, "## Failures ({})\n", result.errors);
        let _ = writeln!(md, "| ID | Error |\n|---|---|");
        for case in result.failed_cases() {
            let message = case.error.as_ref().map(|e| e.to_string()).unwrap_or_default();
            let _ = writeln!(
                md,
                "| {} | {} |",
                escape_cell(&case.id),
                clip_cell(&message, FAILURE_MESSAGE_CHARS)
            );
        }
        md.push('\n');
    }

    let _ = writeln!(md, "## Per-case (Top-{} IDs)\n", k);
    let _ = writeln!(md, "| ID | Hit@K | Latency(ms) | TopIDs |\n|---|---:|---:|---|");
    for case in &result.cases {
        let _ = writeln!(
            md,
            "| {} | {} | {} | `{}` |",
            escape_cell(&case.id),
            case_hit_at_k(case),
            case.latency_ms,
            escape_cell(&case.top_ids().join(", "))
        );
    }

    md
}

#[derive(Serialize)]
struct JsonReport<'a> {
    api_base: &'a str,
    k: usize,
    cases: usize,
    errors: usize,
    eligible: usize,
    metrics: &'a Metrics,
    latency: &'a LatencyStats,
    results: Vec<JsonCase<'a>>,
}

#[derive(Serialize)]
struct JsonCase<'a> {
    id: &'a str,
    query: &'a str,
    k: usize,
    hit_at_k: bool,
    latency_ms: u64,
    top_ids: Vec<&'a str>,
    expected: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<ErrorKind>,
}

/// Render the machine-readable report. Expected ids are sorted for stable output.
pub fn render_json(config: &SuiteConfig, result: &SuiteResult) -> Result<String> {
    let results = result
        .cases
        .iter()
        .map(|case| {
            let mut expected: Vec<&str> = case.expected.iter().map(String::as_str).collect();
            expected.sort_unstable();
            JsonCase {
                id: &case.id,
                query: &case.query,
                k: case.k,
                hit_at_k: case_hit_at_k(case),
                latency_ms: case.latency_ms,
                top_ids: case.top_ids(),
                expected,
                error: case.error.as_ref().map(|e| e.to_string()),
                error_kind: case.error.as_ref().map(|e| e.kind()),
            }
        })
        .collect();

    let report = JsonReport {
        api_base: &config.api_base,
        k: config.k(),
        cases: result.cases.len(),
        errors: result.errors,
        eligible: result.eligible,
        metrics: &result.metrics,
        latency: &result.latency,
        results,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Write the Markdown report, and the JSON report when a path is given.
pub fn write_reports(
    config: &SuiteConfig,
    result: &SuiteResult,
    markdown_path: &Path,
    json_path: Option<&Path>,
) -> Result<()> {
    std::fs::write(markdown_path, render_markdown(config, result))?;
    log::info!("Wrote Markdown report to {}", markdown_path.display());

    if let Some(path) = json_path {
        std::fs::write(path, render_json(config, result)?)?;
        log::info!("Wrote JSON report to {}", path.display());
    }
    Ok(())
}
