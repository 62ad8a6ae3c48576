use std::path::Path;

use tokio::process::Command;

use crate::config::Toolchain;
use crate::domain::{Language, TestParameters};

use super::{BUSY_LOOP_ITERATIONS, LanguageStrategy, RESULT_LINE_PREFIX};

/// Interpreted path: the harness embeds an emissions tracker and reports a
/// single machine-parseable line on stdout.
#[derive(Debug)]
pub struct PythonStrategy;

impl LanguageStrategy for PythonStrategy {
    fn language(&self) -> Language {
        Language::Python
    }

    fn source_extension(&self) -> &'static str {
        "py"
    }

    fn instrumented(&self) -> bool {
        true
    }

    fn synthesize(&self, clean_code: &str, params: &TestParameters) -> String {
        let params = params.sanitized();
        format!(
            r#"{code}

import json as _cm_json

def _cm_busy_loop():
    acc = 0
    for _ in range({busy_iterations}):
        acc += 1
    return acc

def _cm_main():
    tracker = None
    try:
        from codecarbon import EmissionsTracker
        tracker = EmissionsTracker(save_to_file=False, log_level="error")
        tracker.start()
    except Exception:
        tracker = None
    error = ""
    data = list(range({data_size}))
    target = data[len(data) // 2]
    candidate = globals().get("{function_name}")
    try:
        if callable(candidate):
            try:
                candidate(target, data)
            except TypeError:
                candidate()
        else:
            _cm_busy_loop()
    except Exception as exc:
        error = repr(exc)
        _cm_busy_loop()
    emissions = None
    if tracker is not None:
        try:
            emissions = tracker.stop()
        except Exception:
            emissions = None
    print("{prefix}" + _cm_json.dumps({{"emissions_kg": emissions, "error": error}}))

_cm_main()
"#,
            code = clean_code,
            busy_iterations = BUSY_LOOP_ITERATIONS,
            data_size = params.data_size,
            function_name = params.function_name,
            prefix = RESULT_LINE_PREFIX,
        )
    }

    fn compile_command(
        &self,
        _toolchain: &Toolchain,
        _source: &Path,
        _artifact: &Path,
    ) -> Option<Command> {
        None
    }

    fn run_command(
        &self,
        toolchain: &Toolchain,
        source: &Path,
        _artifact: Option<&Path>,
    ) -> Command {
        let mut cmd = Command::new(&toolchain.python);
        cmd.arg(source);
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(name: &str, size: usize) -> TestParameters {
        TestParameters {
            function_name: name.to_string(),
            data_size: size,
        }
    }

    #[test]
    fn unit_embeds_candidate_code_verbatim() {
        let code = "def find_first_occurrence(t, l):\n    return l.index(t)";
        let unit = PythonStrategy.synthesize(code, &params("find_first_occurrence", 1000));
        assert!(unit.starts_with(code));
        assert!(unit.contains("list(range(1000))"));
        assert!(unit.contains("globals().get(\"find_first_occurrence\")"));
    }

    #[test]
    fn unit_always_carries_the_busy_loop_fallback() {
        let unit = PythonStrategy.synthesize("x = 1", &params("missing_function", 10));
        assert!(unit.contains("_cm_busy_loop"));
        assert!(unit.contains("range(10000000)"));
    }

    #[test]
    fn unit_reports_on_a_single_prefixed_line() {
        let unit = PythonStrategy.synthesize("pass", &TestParameters::default());
        assert!(unit.contains("CARBONMETER:"));
        assert!(unit.contains("emissions_kg"));
    }

    #[test]
    fn hostile_function_names_fall_back_to_default() {
        let unit = PythonStrategy.synthesize("pass", &params("\"); import os #", 10));
        assert!(unit.contains("globals().get(\"your_function\")"));
    }
}
