//! Isolated execution of synthesized units: transient files, bounded-timeout
//! compilation and execution, unconditional cleanup.

mod subprocess;

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::Language;

pub use subprocess::SubprocessRunner;

/// Structured result of one trial's compile-and-run. Compile failures and
/// timeouts are data here, not errors; `RunnerError` is reserved for an
/// environment that cannot execute anything at all.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Exit status of the harness process; absent when it was killed.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub compile_failed: bool,
    /// Wall-clock duration of the execution phase, for the physical-model
    /// estimator. Zero when execution never started.
    pub wall_time: Duration,
}

impl RunReport {
    pub fn compile_failure(stderr: String) -> Self {
        Self {
            status: None,
            stdout: String::new(),
            stderr,
            timed_out: false,
            compile_failed: true,
            wall_time: Duration::ZERO,
        }
    }
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum RunnerError {
    /// The host cannot run trials at all: work dir not writable, toolchain
    /// binary missing. Distinct from candidate-code failures; the
    /// aggregator stops retrying on it.
    #[error("execution environment failure: {msg}")]
    Environment { msg: String },
}

#[mockall::automock]
#[async_trait::async_trait]
pub trait ExecutionRunner: std::fmt::Debug + Send + Sync {
    async fn run(&self, unit_text: &str, language: Language) -> Result<RunReport, RunnerError>;
}

/// Transient on-disk materialization of a synthesized unit.
///
/// Dropping the guard deletes the source file and any compiled artifact, so
/// every exit path out of a trial disposes of exactly one unit.
#[derive(Debug)]
pub(crate) struct ExecutionUnit {
    pub source: PathBuf,
    pub artifact: Option<PathBuf>,
}

impl Drop for ExecutionUnit {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.source);
        if let Some(artifact) = &self.artifact {
            let _ = std::fs::remove_file(artifact);
        }
    }
}
