//! Benchmark core: concurrent query runner, hit normalization, IR metrics,
//! latency percentiles, and report rendering.

pub mod latency;
pub mod metrics;
pub mod normalize;
pub mod report;
pub mod runner;

use crate::error::CaseError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

pub use latency::{calc_latency, LatencyStats};
pub use metrics::{calc_metrics, case_hit_at_k, first_hit_rank, is_eligible, Metrics};
pub use normalize::dedup_top_k;
pub use report::{render_json, render_markdown, write_reports};
pub use runner::Runner;

/// Request body for `POST /api/rag/query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub k: usize,
}

/// Explicit `null` reads as the field's default, same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Retrieved document reference. An empty `id` means no identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Success response body of `POST /api/rag/query`
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub answer: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hits: Vec<Hit>,
}

/// A single query with its ground-truth relevance set
#[derive(Debug, Clone)]
pub struct QueryCase {
    pub id: String,
    pub query: String,
    /// Effective top-K for this case.
    pub k: usize,
    pub expected: HashSet<String>,
}

/// Outcome of executing one query case
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub id: String,
    pub query: String,
    pub k: usize,
    /// Normalized hits: at most `k`, unique non-empty ids.
    pub hits: Vec<Hit>,
    pub latency_ms: u64,
    pub error: Option<CaseError>,
    pub expected: HashSet<String>,
}

impl ExecutionResult {
    pub(crate) fn success(case: QueryCase, hits: Vec<Hit>, latency_ms: u64) -> Self {
        Self {
            id: case.id,
            query: case.query,
            k: case.k,
            hits,
            latency_ms,
            error: None,
            expected: case.expected,
        }
    }

    pub(crate) fn failure(case: QueryCase, error: CaseError, latency_ms: u64) -> Self {
        Self {
            id: case.id,
            query: case.query,
            k: case.k,
            hits: Vec::new(),
            latency_ms,
            error: Some(error),
            expected: case.expected,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Ids of the normalized top-K hits, in rank order
    pub fn top_ids(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.id.as_str()).collect()
    }
}

/// Full outcome of a benchmark run
#[derive(Debug, Clone)]
pub struct SuiteResult {
    /// One entry per input case, in input order.
    pub cases: Vec<ExecutionResult>,
    pub metrics: Metrics,
    pub latency: LatencyStats,
    pub errors: usize,
    /// Cases with no error and a non-empty expected set (the metrics denominator).
    pub eligible: usize,
}

impl SuiteResult {
    /// Phase two of a run: aggregate a completed result set
    pub fn from_cases(cases: Vec<ExecutionResult>, k: usize) -> Self {
        let metrics = calc_metrics(&cases, k);
        let latency = calc_latency(&cases);
        let errors = cases.iter().filter(|c| c.is_error()).count();
        let eligible = cases.iter().filter(|c| is_eligible(c)).count();
        Self {
            cases,
            metrics,
            latency,
            errors,
            eligible,
        }
    }

    pub fn failed_cases(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.cases.iter().filter(|c| c.is_error())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn hit(id: &str) -> Hit {
        Hit {
            id: id.to_string(),
            score: 0.0,
            snippet: None,
        }
    }

    pub fn case(id: &str, k: usize, expected: &[&str]) -> QueryCase {
        QueryCase {
            id: id.to_string(),
            query: format!("query for {}", id),
            k,
            expected: expected.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn ok_result(id: &str, expected: &[&str], hits: &[&str], latency_ms: u64) -> ExecutionResult {
        let hits: Vec<Hit> = hits.iter().map(|h| hit(h)).collect();
        ExecutionResult::success(case(id, hits.len().max(1), expected), hits, latency_ms)
    }

    pub fn err_result(id: &str, expected: &[&str], error: CaseError, latency_ms: u64) -> ExecutionResult {
        ExecutionResult::failure(case(id, 5, expected), error, latency_ms)
    }
}
