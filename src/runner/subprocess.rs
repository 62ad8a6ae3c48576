use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::time::{Instant, timeout};
use uuid::Uuid;

use crate::config::{MeasureConfig, Toolchain};
use crate::domain::Language;
use crate::lang::{LanguageStrategy, strategy_for};

use super::{ExecutionRunner, ExecutionUnit, RunReport, RunnerError};

/// Runs synthesized units as child processes under hard wall-clock timeouts.
///
/// Each trial writes a uniquely named source file into the work directory,
/// compiles it when the language requires it, executes with closed stdin and
/// captured output, and deletes source and artifact on every path out.
#[derive(Debug)]
pub struct SubprocessRunner {
    work_dir: std::path::PathBuf,
    toolchain: Toolchain,
    compile_timeout: Duration,
    exec_timeout: Duration,
}

impl SubprocessRunner {
    pub fn new(config: &MeasureConfig) -> Self {
        Self {
            work_dir: config.work_dir.clone(),
            toolchain: config.toolchain.clone(),
            compile_timeout: config.compile_timeout,
            exec_timeout: config.exec_timeout,
        }
    }

    async fn materialize(
        &self,
        unit_text: &str,
        strategy: &dyn LanguageStrategy,
    ) -> Result<ExecutionUnit, RunnerError> {
        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|e| RunnerError::Environment {
                msg: format!("cannot create work dir: {e}"),
            })?;
        let id = Uuid::new_v4();
        let source = self
            .work_dir
            .join(format!("unit_{id}.{}", strategy.source_extension()));
        tokio::fs::write(&source, unit_text)
            .await
            .map_err(|e| RunnerError::Environment {
                msg: format!("cannot write execution unit: {e}"),
            })?;
        Ok(ExecutionUnit {
            source,
            artifact: None,
        })
    }

    /// Compiles the unit in place. `Ok(Some(report))` is a candidate-code
    /// compile failure; `Ok(None)` means the artifact is ready.
    async fn compile(
        &self,
        unit: &mut ExecutionUnit,
        strategy: &dyn LanguageStrategy,
    ) -> Result<Option<RunReport>, RunnerError> {
        let artifact = unit.source.with_extension("out");
        let Some(mut cmd) = strategy.compile_command(&self.toolchain, &unit.source, &artifact)
        else {
            return Ok(None);
        };
        // Register before spawning so a partial artifact is still removed.
        unit.artifact = Some(artifact);

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let output = match timeout(self.compile_timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(RunnerError::Environment {
                    msg: format!("cannot invoke compiler: {e}"),
                });
            }
            Err(_) => {
                tracing::warn!(unit = %unit.source.display(), "compiler timed out");
                return Ok(Some(RunReport::compile_failure(format!(
                    "compiler exceeded its {}s budget",
                    self.compile_timeout.as_secs()
                ))));
            }
        };
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            tracing::debug!(unit = %unit.source.display(), "compilation failed");
            return Ok(Some(RunReport::compile_failure(stderr)));
        }
        Ok(None)
    }

    async fn execute(
        &self,
        unit: &ExecutionUnit,
        strategy: &dyn LanguageStrategy,
    ) -> Result<RunReport, RunnerError> {
        let mut cmd =
            strategy.run_command(&self.toolchain, &unit.source, unit.artifact.as_deref());
        // Closed stdin prevents hangs on interactive reads in candidate code.
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|e| RunnerError::Environment {
            msg: format!("cannot spawn harness process: {e}"),
        })?;

        // Drain both pipes while waiting, otherwise a chatty harness fills
        // the pipe buffer and never exits.
        let stdout_task = child.stdout.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf).await;
                buf
            })
        });
        let stderr_task = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf).await;
                buf
            })
        });

        let (status, timed_out) = match timeout(self.exec_timeout, child.wait()).await {
            Ok(Ok(status)) => (status.code(), false),
            Ok(Err(e)) => {
                return Err(RunnerError::Environment {
                    msg: format!("cannot wait for harness process: {e}"),
                });
            }
            Err(_) => {
                tracing::warn!(unit = %unit.source.display(), "harness timed out, killing");
                let _ = child.kill().await;
                let _ = child.wait().await;
                (None, true)
            }
        };
        let wall_time = started.elapsed();

        let stdout = match stdout_task {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };

        Ok(RunReport {
            status,
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
            timed_out,
            compile_failed: false,
            wall_time,
        })
    }
}

#[async_trait::async_trait]
impl ExecutionRunner for SubprocessRunner {
    async fn run(&self, unit_text: &str, language: Language) -> Result<RunReport, RunnerError> {
        let strategy = strategy_for(language);
        // The unit guard deletes source and artifact on every path out of
        // this scope, including the error returns.
        let mut unit = self.materialize(unit_text, strategy).await?;

        if strategy.needs_compilation() {
            if let Some(report) = self.compile(&mut unit, strategy).await? {
                return Ok(report);
            }
        }

        let report = self.execute(&unit, strategy).await?;
        tracing::debug!(
            language = %language,
            status = ?report.status,
            timed_out = report.timed_out,
            wall_ms = report.wall_time.as_millis() as u64,
            "trial executed"
        );
        Ok(report)
    }
}
