use crate::bench::QueryCase;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tokio::sync::Semaphore;

/// Environment variable consulted when the suite file leaves `api_base` empty.
pub const API_BASE_ENV: &str = "RAGBENCH_API_BASE";

pub const DEFAULT_K: usize = 5;
pub const DEFAULT_PARALLEL: usize = 16;
pub const DEFAULT_TIMEOUT_MS: u64 = 8000;

/// Benchmark suite loaded from `queries.yaml`
#[derive(Debug, Clone, Deserialize)]
pub struct SuiteConfig {
    #[serde(default)]
    pub api_base: String,
    /// Default top-K; missing or non-positive values fall back to 5.
    #[serde(default)]
    pub k: i64,
    #[serde(default)]
    pub queries: Vec<QueryItem>,
}

/// One query entry in the suite file
#[derive(Debug, Clone, Deserialize)]
pub struct QueryItem {
    pub id: String,
    pub query: String,
    #[serde(default)]
    pub expected_doc_ids: Vec<String>,
    /// Optional per-case top-K; absent means the suite K.
    #[serde(default)]
    pub k: Option<i64>,
}

impl SuiteConfig {
    /// Load a suite from a YAML file
    ///
    /// Loads environment variables from .env file (if present) first, so that
    /// `RAGBENCH_API_BASE` can supply the API base when the file omits it.
    pub fn load(path: &Path) -> Result<Self> {
        let _ = dotenv::dotenv();

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read suite file: {}", path.display()))?;

        Self::from_yaml(&raw)
            .with_context(|| format!("Failed to parse suite file: {}", path.display()))
    }

    /// Parse a suite from YAML text and apply defaults
    pub fn from_yaml(raw: &str) -> Result<Self> {
        let mut config: SuiteConfig = serde_yaml_ng::from_str(raw)?;

        if config.k <= 0 {
            config.k = DEFAULT_K as i64;
        }
        if config.api_base.trim().is_empty() {
            if let Ok(base) = std::env::var(API_BASE_ENV) {
                config.api_base = base;
            }
        }

        Ok(config)
    }

    /// Apply command-line overrides. A non-positive `k` is ignored.
    pub fn apply_overrides(&mut self, api_base: Option<String>, k: Option<i64>) {
        if let Some(api) = api_base.filter(|a| !a.trim().is_empty()) {
            self.api_base = api;
        }
        if let Some(k) = k.filter(|k| *k > 0) {
            self.k = k;
        }
    }

    /// Validate the resolved suite and normalize the API base
    pub fn validate(&mut self) -> Result<()> {
        let base = self.api_base.trim().trim_end_matches('/').to_string();
        if base.is_empty() {
            anyhow::bail!(
                "api_base is not set. Set it in the suite file, pass --api, or set {}.",
                API_BASE_ENV
            );
        }
        url::Url::parse(&base).with_context(|| format!("api_base is not a valid URL: {}", base))?;
        self.api_base = base;

        if self.queries.is_empty() {
            anyhow::bail!("Suite contains no queries");
        }

        let mut seen = HashSet::with_capacity(self.queries.len());
        for item in &self.queries {
            if item.id.trim().is_empty() {
                anyhow::bail!("Query with text {:?} has an empty id", item.query);
            }
            if !seen.insert(item.id.as_str()) {
                anyhow::bail!("Duplicate query id: {}", item.id);
            }
            if matches!(item.k, Some(k) if k <= 0) {
                anyhow::bail!("Query {} has a non-positive k", item.id);
            }
        }

        Ok(())
    }

    /// Effective suite K
    pub fn k(&self) -> usize {
        if self.k > 0 {
            self.k as usize
        } else {
            DEFAULT_K
        }
    }

    /// Resolve the query entries into immutable cases, in file order
    pub fn cases(&self) -> Vec<QueryCase> {
        let default_k = self.k();
        self.queries
            .iter()
            .map(|item| QueryCase {
                id: item.id.clone(),
                query: item.query.clone(),
                k: item
                    .k
                    .filter(|k| *k > 0)
                    .map(|k| k as usize)
                    .unwrap_or(default_k),
                expected: item.expected_doc_ids.iter().cloned().collect(),
            })
            .collect()
    }
}

/// Runner tuning: admission bound and per-call deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub parallel: usize,
    pub timeout_ms: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            parallel: DEFAULT_PARALLEL,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl RunOptions {
    /// Build options, replacing non-positive values with the defaults.
    /// `parallel` is capped at the largest admission bound the runner supports.
    pub fn new(parallel: i64, timeout_ms: i64) -> Self {
        Self {
            parallel: if parallel > 0 {
                (parallel as u64).min(Semaphore::MAX_PERMITS as u64) as usize
            } else {
                DEFAULT_PARALLEL
            },
            timeout_ms: if timeout_ms > 0 {
                timeout_ms as u64
            } else {
                DEFAULT_TIMEOUT_MS
            },
        }
    }

    pub(crate) fn resolved(self) -> Self {
        Self {
            parallel: match self.parallel {
                0 => DEFAULT_PARALLEL,
                p => p.min(Semaphore::MAX_PERMITS),
            },
            timeout_ms: match self.timeout_ms {
                0 => DEFAULT_TIMEOUT_MS,
                t => t,
            },
        }
    }
}
