use std::time::Duration;

use serde::Deserialize;

use crate::config::PowerModelConfig;
use crate::lang::RESULT_LINE_PREFIX;

/// Sample reported by an instrumented harness through its result line.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TrackerSample {
    /// Absent when the tracker was unavailable or failed internally.
    pub emissions_kg: Option<f64>,
    /// Error text from the candidate call, empty when it ran cleanly.
    #[serde(default)]
    pub error: String,
}

/// Scans harness stdout for the result line, newest first, so candidate code
/// printing arbitrary text cannot shadow the report. Malformed or missing
/// lines yield `None`; absence is data here, never an error.
pub fn parse_tracker_line(stdout: &str) -> Option<TrackerSample> {
    stdout
        .lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix(RESULT_LINE_PREFIX))
        .and_then(|payload| serde_json::from_str(payload).ok())
}

/// Coarse fallback estimator: assumed constant power draw integrated over
/// wall-clock time, converted through grid carbon intensity. Explicitly
/// lower fidelity than an instrumented sample.
#[derive(Clone, Debug)]
pub struct PhysicalModel {
    watts: f64,
    carbon_intensity_kg_per_kwh: f64,
}

impl PhysicalModel {
    pub fn new(config: &PowerModelConfig) -> Self {
        Self {
            watts: config.cpu_watts_per_core * config.logical_cores as f64 + config.gpu_watts,
            carbon_intensity_kg_per_kwh: config.carbon_intensity_kg_per_kwh,
        }
    }

    /// Kilograms of CO2-equivalent for a run of the given duration.
    pub fn estimate(&self, elapsed: Duration) -> f64 {
        let kwh = self.watts * elapsed.as_secs_f64() / 3_600_000.0;
        (kwh * self.carbon_intensity_kg_per_kwh).max(0.0)
    }
}
