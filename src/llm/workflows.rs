use std::sync::Arc;

use serde::Serialize;
use tokio::time::Instant;

use crate::domain::{Language, MeasurementOutcome, MeasurementRequest, TestParameters};
use crate::error::MeasureError;
use crate::normalize::Normalizer;
use crate::pipeline::MeasurementPipeline;

use super::{CodeModel, ModelError};

const GENERATE_SYSTEM_PROMPT: &str =
    "You write complete, runnable source code. Reply with a single code block and nothing else.";
const OPTIMIZE_SYSTEM_PROMPT: &str =
    "You rewrite source code to use less CPU time and energy while preserving behavior. \
     Reply with a single code block and nothing else.";
const COMPLETION_MAX_TOKENS: u32 = 1024;

/// Emissions report for a generate-then-run request.
#[derive(Clone, Debug, Serialize)]
pub struct GenerationReport {
    pub code: String,
    /// Inference cost of the model call, physical-model attributed.
    pub inference_emissions_kg: f64,
    pub execution: MeasurementOutcome,
    pub total_emissions_kg: f64,
}

/// Emissions report for an optimize request: both variants are measured
/// independently and the delta is exactly `before - after`.
#[derive(Clone, Debug, Serialize)]
pub struct OptimizationReport {
    pub optimized_code: String,
    pub inference_emissions_kg: f64,
    pub before: MeasurementOutcome,
    pub after: MeasurementOutcome,
    pub delta_kg: f64,
}

/// Ties the model collaborator to the measurement pipeline: generate code
/// and measure it, or optimize code and measure both variants.
#[derive(Debug)]
pub struct CarbonAdvisor {
    model: Arc<dyn CodeModel>,
    pipeline: MeasurementPipeline,
    normalizer: Normalizer,
}

impl CarbonAdvisor {
    pub fn new(model: Arc<dyn CodeModel>, pipeline: MeasurementPipeline) -> Self {
        Self {
            model,
            pipeline,
            normalizer: Normalizer::new(),
        }
    }

    #[tracing::instrument(skip(self, prompt))]
    pub async fn generate(
        &self,
        prompt: &str,
        language: Language,
        test_params: TestParameters,
    ) -> Result<GenerationReport, MeasureError> {
        if prompt.trim().is_empty() {
            return Err(MeasureError::EmptyInput("prompt"));
        }

        let (raw, inference_emissions_kg) = self
            .complete_with_attribution(GENERATE_SYSTEM_PROMPT, prompt)
            .await?;
        let code = self.normalizer.normalize(&raw);

        let execution = self
            .pipeline
            .measure(&MeasurementRequest {
                code: code.clone(),
                language,
                test_params,
            })
            .await?;

        let total_emissions_kg = inference_emissions_kg + execution.average_emissions_kg;
        Ok(GenerationReport {
            code,
            inference_emissions_kg,
            execution,
            total_emissions_kg,
        })
    }

    #[tracing::instrument(skip(self, code))]
    pub async fn optimize(
        &self,
        code: &str,
        language: Language,
        test_params: TestParameters,
    ) -> Result<OptimizationReport, MeasureError> {
        if code.trim().is_empty() {
            return Err(MeasureError::EmptyInput("code"));
        }

        let before = self
            .pipeline
            .measure(&MeasurementRequest {
                code: code.to_string(),
                language,
                test_params: test_params.clone(),
            })
            .await?;

        let (raw, inference_emissions_kg) = self
            .complete_with_attribution(OPTIMIZE_SYSTEM_PROMPT, code)
            .await?;
        let optimized_code = self.normalizer.normalize(&raw);

        let after = self
            .pipeline
            .measure(&MeasurementRequest {
                code: optimized_code.clone(),
                language,
                test_params,
            })
            .await?;

        // Both measurements are independently sampled; the reported delta is
        // the plain difference, no extra rounding.
        let delta_kg = before.average_emissions_kg - after.average_emissions_kg;
        Ok(OptimizationReport {
            optimized_code,
            inference_emissions_kg,
            before,
            after,
            delta_kg,
        })
    }

    /// Calls the model and attributes the call's duration through the
    /// physical power model.
    async fn complete_with_attribution(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<(String, f64), MeasureError> {
        let started = Instant::now();
        let raw = self
            .model
            .complete(system_prompt, user_prompt, COMPLETION_MAX_TOKENS)
            .await
            .map_err(|e: ModelError| MeasureError::UpstreamUnavailable(e.to_string()))?;
        let emissions = self.pipeline.physical_model().estimate(started.elapsed());
        tracing::debug!(inference_emissions_kg = emissions, "model call attributed");
        Ok((raw, emissions))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::MeasureConfig;
    use crate::llm::MockCodeModel;
    use crate::runner::{MockExecutionRunner, RunReport};

    use super::*;

    fn measured_runner(kg: f64) -> MockExecutionRunner {
        let mut runner = MockExecutionRunner::new();
        runner.expect_run().returning(move |_, _| {
            Ok(RunReport {
                status: Some(0),
                stdout: format!("CARBONMETER:{{\"emissions_kg\": {kg}, \"error\": \"\"}}"),
                stderr: String::new(),
                timed_out: false,
                compile_failed: false,
                wall_time: Duration::from_millis(5),
            })
        });
        runner
    }

    fn quick_pipeline(runner: MockExecutionRunner) -> MeasurementPipeline {
        let config = MeasureConfig {
            trials: 3,
            trial_pause: Duration::from_millis(1),
            ..MeasureConfig::default()
        };
        MeasurementPipeline::with_runner(config, Arc::new(runner))
    }

    #[tokio::test]
    async fn generate_measures_the_extracted_code() {
        let mut model = MockCodeModel::new();
        model.expect_complete().returning(|_, _, _| {
            Ok("Sure!\n```python\ndef your_function(t, l):\n    return t\n```\n".to_string())
        });

        let advisor = CarbonAdvisor::new(
            Arc::new(model),
            quick_pipeline(measured_runner(1.0e-6)),
        );
        let report = advisor
            .generate("write a search function", Language::Python, TestParameters::default())
            .await
            .unwrap();

        assert_eq!(report.code, "def your_function(t, l):\n    return t\n");
        assert_eq!(report.execution.sample_count, 3);
        assert!(report.inference_emissions_kg >= 0.0);
        assert_eq!(
            report.total_emissions_kg,
            report.inference_emissions_kg + report.execution.average_emissions_kg
        );
    }

    #[tokio::test]
    async fn generate_rejects_empty_prompt_without_model_call() {
        let model = MockCodeModel::new();
        let advisor = CarbonAdvisor::new(
            Arc::new(model),
            quick_pipeline(MockExecutionRunner::new()),
        );
        let err = advisor
            .generate("  ", Language::Python, TestParameters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MeasureError::EmptyInput("prompt")));
    }

    #[tokio::test]
    async fn model_failure_surfaces_as_upstream_unavailable() {
        let mut model = MockCodeModel::new();
        model.expect_complete().returning(|_, _, _| {
            Err(ModelError::Api {
                status: 503,
                msg: "overloaded".to_string(),
            })
        });

        let advisor = CarbonAdvisor::new(
            Arc::new(model),
            quick_pipeline(MockExecutionRunner::new()),
        );
        let err = advisor
            .generate("write code", Language::Python, TestParameters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MeasureError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn optimize_delta_is_exactly_before_minus_after() {
        let mut model = MockCodeModel::new();
        model
            .expect_complete()
            .returning(|_, code, _| Ok(code.to_string()));

        let advisor = CarbonAdvisor::new(
            Arc::new(model),
            quick_pipeline(measured_runner(3.0e-6)),
        );
        let report = advisor
            .optimize(
                "def your_function(t, l):\n    return l.index(t)\n",
                Language::Python,
                TestParameters::default(),
            )
            .await
            .unwrap();

        assert_eq!(
            report.delta_kg,
            report.before.average_emissions_kg - report.after.average_emissions_kg
        );
        assert_eq!(report.before.sample_count, 3);
        assert_eq!(report.after.sample_count, 3);
    }
}
