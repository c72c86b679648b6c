//! Concurrent suite runner.
//!
//! Every case becomes one tokio task issuing a single `POST /api/rag/query`.
//! Tasks are admitted in input order through a counting semaphore, each call
//! runs under its own deadline, and results are collected from the join
//! handles in spawn order so the output lines up with the input.

use super::normalize::dedup_top_k;
use super::{ExecutionResult, QueryCase, QueryRequest, QueryResponse, SuiteResult};
use crate::config::RunOptions;
use crate::error::{BenchError, CaseError, Result};
use futures_util::future::join_all;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Number of response-body characters kept in a status error.
const ERROR_BODY_CHARS: usize = 200;

/// HTTP client for a single target endpoint. Cheap to clone.
#[derive(Clone)]
struct QueryClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl QueryClient {
    /// Execute one case. Never fails: errors are recorded on the result.
    async fn execute(&self, case: QueryCase) -> ExecutionResult {
        let started = Instant::now();
        let request = QueryRequest {
            question: case.query.clone(),
            k: case.k,
        };

        // Dropping the call future on expiry cancels only this request.
        let outcome = tokio::time::timeout(self.timeout, self.call(&request, started)).await;

        match outcome {
            Ok((latency_ms, Ok(response))) => {
                let hits = dedup_top_k(response.hits, case.k);
                ExecutionResult::success(case, hits, latency_ms)
            }
            Ok((latency_ms, Err(err))) => ExecutionResult::failure(case, err, latency_ms),
            Err(_) => {
                let err = CaseError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                };
                ExecutionResult::failure(case, err, elapsed_ms(started))
            }
        }
    }

    /// Latency is measured up to the response head (or the transport failure).
    async fn call(
        &self,
        request: &QueryRequest,
        started: Instant,
    ) -> (u64, std::result::Result<QueryResponse, CaseError>) {
        let response = match self.client.post(&self.endpoint).json(request).send().await {
            Ok(r) => r,
            Err(e) => return (elapsed_ms(started), Err(CaseError::Transport(e.to_string()))),
        };
        let latency_ms = elapsed_ms(started);

        let status = response.status();
        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return (latency_ms, Err(CaseError::Transport(e.to_string()))),
        };

        if status.as_u16() >= 300 {
            let text = String::from_utf8_lossy(&body);
            return (
                latency_ms,
                Err(CaseError::Status {
                    status: status.as_u16(),
                    body: truncate_body(&text),
                }),
            );
        }

        let parsed = serde_json::from_slice::<QueryResponse>(&body)
            .map_err(|e| CaseError::Decode(e.to_string()));
        (latency_ms, parsed)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn truncate_body(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(ERROR_BODY_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Bounded-parallelism benchmark runner
pub struct Runner {
    client: QueryClient,
    options: RunOptions,
}

impl Runner {
    /// Create a runner against `api_base`
    ///
    /// # Arguments
    ///
    /// * `api_base` - Service base URL; the endpoint is `{api_base}/api/rag/query`
    /// * `options` - Admission bound and per-call timeout; zero values take the defaults
    pub fn new(api_base: &str, options: RunOptions) -> Result<Self> {
        let base = api_base.trim().trim_end_matches('/');
        url::Url::parse(base)
            .map_err(|e| BenchError::Config(format!("invalid api_base {:?}: {}", api_base, e)))?;

        let options = options.resolved();
        let client = Client::builder().build()?;
        Ok(Self {
            client: QueryClient {
                client,
                endpoint: format!("{}/api/rag/query", base),
                timeout: Duration::from_millis(options.timeout_ms),
            },
            options,
        })
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    pub fn endpoint(&self) -> &str {
        &self.client.endpoint
    }

    /// Run every case to completion, then aggregate.
    ///
    /// `k` is the nominal suite K used by the ideal-DCG cutoff. The returned
    /// `cases` are in the same order as the input regardless of completion order.
    pub async fn run(&self, cases: &[QueryCase], k: usize) -> SuiteResult {
        log::info!(
            "Running {} cases against {} (parallel={}, timeout={}ms)",
            cases.len(),
            self.client.endpoint,
            self.options.parallel,
            self.options.timeout_ms
        );
        let started = Instant::now();

        let gate = Arc::new(Semaphore::new(self.options.parallel));
        let mut handles = Vec::with_capacity(cases.len());

        for case in cases.iter().cloned() {
            // Admission in input order; the permit is released when the task ends.
            let permit = gate
                .clone()
                .acquire_owned()
                .await
                .expect("admission semaphore is never closed");
            let client = self.client.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                client.execute(case).await
            }));
        }

        let joined = join_all(handles).await;

        let results: Vec<ExecutionResult> = joined
            .into_iter()
            .zip(cases.iter())
            .map(|(outcome, case)| match outcome {
                Ok(result) => result,
                Err(e) => ExecutionResult::failure(case.clone(), CaseError::Task(e.to_string()), 0),
            })
            .collect();

        for result in &results {
            match &result.error {
                Some(err) => log::warn!("Case {} failed after {}ms: {}", result.id, result.latency_ms, err),
                None => log::debug!(
                    "Case {} returned {} hits in {}ms",
                    result.id,
                    result.hits.len(),
                    result.latency_ms
                ),
            }
        }

        let suite = SuiteResult::from_cases(results, k);
        log::info!(
            "Completed {} cases in {:?} ({} errors, {} eligible)",
            suite.cases.len(),
            started.elapsed(),
            suite.errors,
            suite.eligible
        );
        suite
    }
}
