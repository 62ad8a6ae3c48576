//! Carbon-footprint estimation for AI-generated code.
//!
//! The crate takes a snippet of untrusted source code, wraps it in a
//! self-contained harness, runs it in an isolated subprocess under a hard
//! timeout, and converts the run into a CO2-equivalent estimate. Repeated
//! trials are reduced to a single comparable number.

pub mod config;
pub mod domain;
pub mod error;
pub mod estimator;
pub mod lang;
pub mod llm;
pub mod normalize;
pub mod pipeline;
pub mod runner;

pub use config::MeasureConfig;
pub use domain::{Language, MeasurementOutcome, MeasurementRequest, TestParameters, TrialResult};
pub use error::MeasureError;
pub use llm::{CarbonAdvisor, CodeModel, GenerationReport, OpenAiModel, OptimizationReport};
pub use pipeline::MeasurementPipeline;
