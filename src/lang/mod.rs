//! Per-language strategies: harness synthesis plus the compile/run commands
//! the runner shells out to. Adding a language means adding one
//! implementation here, not editing branches across the crate.

mod c;
mod python;

use std::path::Path;

use tokio::process::Command;

use crate::config::Toolchain;
use crate::domain::{Language, TestParameters};

pub use c::CStrategy;
pub use python::PythonStrategy;

/// Iteration count for the fixed CPU-bound fallback workload used when the
/// requested function is missing or the candidate code faults.
pub const BUSY_LOOP_ITERATIONS: u64 = 10_000_000;

/// Prefix of the machine-parseable result line an instrumented harness
/// prints on stdout.
pub const RESULT_LINE_PREFIX: &str = "CARBONMETER:";

pub trait LanguageStrategy: std::fmt::Debug + Send + Sync {
    fn language(&self) -> Language;

    fn source_extension(&self) -> &'static str;

    /// Whether the unit must be compiled ahead of time.
    fn needs_compilation(&self) -> bool {
        false
    }

    /// Whether the synthesized harness embeds its own emissions tracker and
    /// reports through the result line. When false the runner's wall clock
    /// feeds the physical-model estimator instead.
    fn instrumented(&self) -> bool {
        false
    }

    /// Wraps candidate code into a complete, self-contained executable unit
    /// that runs to completion without interactive input.
    fn synthesize(&self, clean_code: &str, params: &TestParameters) -> String;

    /// Compiler invocation producing `artifact` from `source`, for languages
    /// that need one.
    fn compile_command(
        &self,
        toolchain: &Toolchain,
        source: &Path,
        artifact: &Path,
    ) -> Option<Command>;

    /// Invocation that executes the unit: the interpreter over `source`, or
    /// the compiled `artifact`.
    fn run_command(&self, toolchain: &Toolchain, source: &Path, artifact: Option<&Path>)
    -> Command;
}

/// Resolves the strategy for a language. Total over the enum; rejecting
/// unknown language names happens at the parsing boundary.
pub fn strategy_for(language: Language) -> &'static dyn LanguageStrategy {
    match language {
        Language::Python => &PythonStrategy,
        Language::C => &CStrategy,
    }
}
