use std::path::PathBuf;
use std::time::Duration;

/// Process-wide configuration for the measurement subsystem.
///
/// Built once at startup and passed by reference into the pipeline; there is
/// no ambient global state.
#[derive(Debug, Clone)]
pub struct MeasureConfig {
    /// Number of measurement trials per submission.
    pub trials: usize,
    /// Pause between trials, letting transient system load settle.
    pub trial_pause: Duration,
    /// Wall-clock budget for one compiler invocation.
    pub compile_timeout: Duration,
    /// Wall-clock budget for one harness execution.
    pub exec_timeout: Duration,
    /// Directory for transient execution units.
    pub work_dir: PathBuf,
    pub toolchain: Toolchain,
    pub power: PowerModelConfig,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            trials: 3,
            trial_pause: Duration::from_secs(2),
            compile_timeout: Duration::from_secs(90),
            exec_timeout: Duration::from_secs(180),
            work_dir: std::env::temp_dir().join("carbonmeter"),
            toolchain: Toolchain::default(),
            power: PowerModelConfig::default(),
        }
    }
}

/// Paths to the external interpreters and compilers the runner shells out to.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub python: PathBuf,
    pub cc: PathBuf,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            python: PathBuf::from("python3"),
            cc: PathBuf::from("cc"),
        }
    }
}

/// Constants for the physical-model emissions estimate.
///
/// These are coarse approximations; callers with calibrated hardware data
/// should override them. The defaults assume a mid-range server core draw
/// and the global-average grid carbon intensity.
#[derive(Debug, Clone)]
pub struct PowerModelConfig {
    pub cpu_watts_per_core: f64,
    pub logical_cores: usize,
    pub gpu_watts: f64,
    /// Kilograms of CO2-equivalent per kilowatt-hour.
    pub carbon_intensity_kg_per_kwh: f64,
}

impl Default for PowerModelConfig {
    fn default() -> Self {
        Self {
            cpu_watts_per_core: 12.5,
            logical_cores: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            gpu_watts: 75.0,
            carbon_intensity_kg_per_kwh: 0.475,
        }
    }
}
