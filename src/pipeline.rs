use std::sync::Arc;

use crate::config::MeasureConfig;
use crate::domain::{MeasurementOutcome, MeasurementRequest, TrialResult};
use crate::error::MeasureError;
use crate::estimator::{PhysicalModel, parse_tracker_line};
use crate::lang::strategy_for;
use crate::normalize::Normalizer;
use crate::runner::{ExecutionRunner, RunReport, RunnerError, SubprocessRunner};

/// Repeated-trial measurement of one submission.
///
/// Trials are strictly sequential with a settling pause between them;
/// concurrent trials would contend for the measurement instrumentation and
/// pollute the samples.
#[derive(Debug)]
pub struct MeasurementPipeline {
    config: MeasureConfig,
    normalizer: Normalizer,
    physical_model: PhysicalModel,
    runner: Arc<dyn ExecutionRunner>,
}

impl MeasurementPipeline {
    pub fn new(config: MeasureConfig) -> Self {
        let runner = Arc::new(SubprocessRunner::new(&config));
        Self::with_runner(config, runner)
    }

    pub fn with_runner(config: MeasureConfig, runner: Arc<dyn ExecutionRunner>) -> Self {
        let physical_model = PhysicalModel::new(&config.power);
        Self {
            config,
            normalizer: Normalizer::new(),
            physical_model,
            runner,
        }
    }

    pub fn config(&self) -> &MeasureConfig {
        &self.config
    }

    pub fn physical_model(&self) -> &PhysicalModel {
        &self.physical_model
    }

    /// Runs the full normalize → synthesize → execute → estimate pipeline
    /// `config.trials` times and reduces the samples to their mean.
    ///
    /// Per-trial failures (compile errors, timeouts, runtime faults) are
    /// recovered here and reported through the outcome; only empty input
    /// propagates as a hard error.
    #[tracing::instrument(skip(self, request), fields(language = %request.language))]
    pub async fn measure(
        &self,
        request: &MeasurementRequest,
    ) -> Result<MeasurementOutcome, MeasureError> {
        if request.code.trim().is_empty() {
            return Err(MeasureError::EmptyInput("code"));
        }

        let clean = self.normalizer.normalize(&request.code);
        let strategy = strategy_for(request.language);
        let unit_text = strategy.synthesize(&clean, &request.test_params);

        let mut per_trial = Vec::with_capacity(self.config.trials);
        for trial_idx in 0..self.config.trials {
            match self.runner.run(&unit_text, request.language).await {
                Ok(report) => {
                    // An instrumented harness that exits cleanly must have
                    // printed its result line; a clean exit without one means
                    // the measurement report itself is broken and further
                    // repetitions cannot fare better.
                    let malformed_report = strategy.instrumented()
                        && !report.timed_out
                        && !report.compile_failed
                        && report.status == Some(0)
                        && parse_tracker_line(&report.stdout).is_none();
                    if malformed_report {
                        tracing::error!(trial = trial_idx, "harness produced no measurement report, stopping");
                        per_trial.push(TrialResult::failed(
                            "harness exited cleanly without a measurement report",
                        ));
                        break;
                    }

                    let trial = self.trial_from_report(report, strategy.instrumented());
                    tracing::debug!(
                        trial = trial_idx,
                        emissions_kg = ?trial.emissions_kg,
                        timed_out = trial.timed_out,
                        compile_failed = trial.compile_failed,
                        "trial finished"
                    );
                    per_trial.push(trial);
                }
                Err(RunnerError::Environment { msg }) => {
                    // This configuration cannot succeed; further repetitions
                    // would only burn time.
                    tracing::error!(trial = trial_idx, %msg, "environment failure, stopping");
                    per_trial.push(TrialResult::failed(msg));
                    break;
                }
            }
            if trial_idx + 1 < self.config.trials {
                tokio::time::sleep(self.config.trial_pause).await;
            }
        }

        let outcome = MeasurementOutcome::from_trials(per_trial);
        tracing::info!(
            average_emissions_kg = outcome.average_emissions_kg,
            sample_count = outcome.sample_count,
            "measurement complete"
        );
        Ok(outcome)
    }

    fn trial_from_report(&self, report: RunReport, instrumented: bool) -> TrialResult {
        if report.compile_failed {
            return TrialResult {
                emissions_kg: None,
                stderr: report.stderr,
                timed_out: false,
                compile_failed: true,
            };
        }
        if report.timed_out {
            return TrialResult {
                emissions_kg: None,
                stderr: report.stderr,
                timed_out: true,
                compile_failed: false,
            };
        }

        let mut stderr = report.stderr;
        let emissions_kg = if instrumented {
            match parse_tracker_line(&report.stdout) {
                Some(sample) => {
                    if !sample.error.is_empty() {
                        if !stderr.is_empty() {
                            stderr.push('\n');
                        }
                        stderr.push_str(&sample.error);
                    }
                    match sample.emissions_kg {
                        Some(kg) => Some(kg.max(0.0)),
                        // Tracker unavailable; the workload still ran, so
                        // fall back to the physical model over wall time.
                        None => Some(self.physical_model.estimate(report.wall_time)),
                    }
                }
                // No result line and a non-zero exit: the harness never
                // reached its reporting step (e.g. a syntax error aborted
                // the module), so no workload is attributable.
                None => None,
            }
        } else if report.status == Some(0) {
            Some(self.physical_model.estimate(report.wall_time))
        } else {
            None
        };

        TrialResult {
            emissions_kg,
            stderr,
            timed_out: false,
            compile_failed: false,
        }
    }
}
