use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MeasureError;

/// Target language of a submission. Extensible: adding a language means
/// adding a variant here plus one `LanguageStrategy` implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    C,
}

impl FromStr for Language {
    type Err = MeasureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" => Ok(Language::Python),
            "c" => Ok(Language::C),
            other => Err(MeasureError::UnsupportedLanguage(other.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Python => write!(f, "python"),
            Language::C => write!(f, "c"),
        }
    }
}

/// One measurement request as the excluded request layer hands it over.
#[derive(Clone, Debug, Deserialize)]
pub struct MeasurementRequest {
    pub code: String,
    pub language: Language,
    #[serde(default)]
    pub test_params: TestParameters,
}

/// Synthetic-workload parameters for the harness. The system can never know
/// the true signature of generated code, so both fields have defaults.
#[derive(Clone, Debug, Deserialize)]
pub struct TestParameters {
    #[serde(default = "TestParameters::default_function_name")]
    pub function_name: String,
    #[serde(default = "TestParameters::default_data_size")]
    pub data_size: usize,
}

impl TestParameters {
    pub const DEFAULT_FUNCTION_NAME: &'static str = "your_function";
    pub const DEFAULT_DATA_SIZE: usize = 100_000;

    fn default_function_name() -> String {
        Self::DEFAULT_FUNCTION_NAME.to_string()
    }

    fn default_data_size() -> usize {
        Self::DEFAULT_DATA_SIZE
    }

    /// Returns parameters safe to splice into harness source text.
    ///
    /// A non-identifier function name can never match a defined name in any
    /// supported language and would corrupt the synthesized unit, so it is
    /// replaced by the default; the busy-loop fallback still guarantees a
    /// measurable workload.
    pub fn sanitized(&self) -> Self {
        let function_name = if is_identifier(&self.function_name) {
            self.function_name.clone()
        } else {
            Self::default_function_name()
        };
        Self {
            function_name,
            data_size: self.data_size.max(1),
        }
    }
}

impl Default for TestParameters {
    fn default() -> Self {
        Self {
            function_name: Self::default_function_name(),
            data_size: Self::default_data_size(),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Outcome of one synthesize-execute-measure cycle.
#[derive(Clone, Debug, Serialize)]
pub struct TrialResult {
    /// Defined only when a workload actually ran to completion.
    pub emissions_kg: Option<f64>,
    pub stderr: String,
    pub timed_out: bool,
    pub compile_failed: bool,
}

impl TrialResult {
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            emissions_kg: None,
            stderr: stderr.into(),
            timed_out: false,
            compile_failed: false,
        }
    }
}

/// Externally visible result of measuring one submission.
#[derive(Clone, Debug, Serialize)]
pub struct MeasurementOutcome {
    pub average_emissions_kg: f64,
    pub sample_count: usize,
    pub per_trial: Vec<TrialResult>,
    pub measured_at: chrono::DateTime<chrono::Utc>,
}

impl MeasurementOutcome {
    pub fn from_trials(per_trial: Vec<TrialResult>) -> Self {
        let samples: Vec<f64> = per_trial.iter().filter_map(|t| t.emissions_kg).collect();
        let average_emissions_kg = if samples.is_empty() {
            0.0
        } else {
            samples.iter().sum::<f64>() / samples.len() as f64
        };
        Self {
            average_emissions_kg,
            sample_count: per_trial.len(),
            per_trial,
            measured_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_parses_lowercase_names() {
        assert_eq!("python".parse::<Language>().unwrap(), Language::Python);
        assert_eq!(" C ".parse::<Language>().unwrap(), Language::C);
    }

    #[test]
    fn language_rejects_unknown_names() {
        let err = "cobol".parse::<Language>().unwrap_err();
        assert!(matches!(err, MeasureError::UnsupportedLanguage(name) if name == "cobol"));
    }

    #[test]
    fn test_params_default_when_request_omits_them() {
        let req: MeasurementRequest =
            serde_json::from_str(r#"{"code": "pass", "language": "python"}"#).unwrap();
        assert_eq!(req.test_params.function_name, "your_function");
        assert_eq!(req.test_params.data_size, 100_000);
    }

    #[test]
    fn sanitized_replaces_non_identifier_names() {
        let params = TestParameters {
            function_name: "os.system('rm')".to_string(),
            data_size: 10,
        };
        assert_eq!(params.sanitized().function_name, "your_function");

        let params = TestParameters {
            function_name: "find_first_occurrence".to_string(),
            data_size: 10,
        };
        assert_eq!(params.sanitized().function_name, "find_first_occurrence");
    }

    #[test]
    fn outcome_averages_only_defined_samples() {
        let outcome = MeasurementOutcome::from_trials(vec![
            TrialResult {
                emissions_kg: Some(2.0e-6),
                stderr: String::new(),
                timed_out: false,
                compile_failed: false,
            },
            TrialResult {
                emissions_kg: None,
                stderr: "boom".to_string(),
                timed_out: true,
                compile_failed: false,
            },
            TrialResult {
                emissions_kg: Some(4.0e-6),
                stderr: String::new(),
                timed_out: false,
                compile_failed: false,
            },
        ]);
        assert_eq!(outcome.sample_count, 3);
        assert!((outcome.average_emissions_kg - 3.0e-6).abs() < 1e-12);
    }

    #[test]
    fn outcome_is_zero_when_no_trial_succeeds() {
        let outcome = MeasurementOutcome::from_trials(vec![
            TrialResult::failed("compile error"),
            TrialResult::failed("compile error"),
        ]);
        assert_eq!(outcome.average_emissions_kg, 0.0);
        assert_eq!(outcome.sample_count, 2);
    }
}
