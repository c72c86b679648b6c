pub mod bench;
pub mod config;
pub mod error;

pub use bench::{ExecutionResult, Hit, QueryCase, Runner, SuiteResult};
pub use config::{RunOptions, SuiteConfig};
pub use error::{BenchError, CaseError, Result};
