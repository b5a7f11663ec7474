//! TOML configuration for the `gridsim` binary.
//!
//! Every section and field is optional:
//!
//! ```toml
//! [solver]
//! algorithm = "nr"
//! max_iterations = 20
//! tolerance_mva = 1e-6
//! linear_solver = "faer"
//!
//! [limits]
//! min_vm_pu = 0.95
//! max_vm_pu = 1.05
//! max_loading_percent = 100.0
//!
//! [system]
//! sn_mva = 1.0
//! f_hz = 50.0
//!
//! [logging]
//! level = "info"
//!
//! [output]
//! pretty = true
//! ```

use anyhow::{Context, Result};
use gridsim_algo::{Algorithm, PowerFlowSettings, SimulationOptions, ViolationLimits};
use gridsim_core::solver::LinearSolverKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridsimConfig {
    pub solver: SolverConfig,
    pub limits: LimitsConfig,
    pub system: SystemConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub algorithm: String,
    pub max_iterations: usize,
    pub tolerance_mva: f64,
    /// `gauss` or `faer`
    pub linear_solver: String,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            algorithm: "nr".to_string(),
            max_iterations: 20,
            tolerance_mva: 1e-6,
            linear_solver: "faer".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub min_vm_pu: f64,
    pub max_vm_pu: f64,
    pub max_loading_percent: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let limits = ViolationLimits::default();
        Self {
            min_vm_pu: limits.min_vm_pu,
            max_vm_pu: limits.max_vm_pu,
            max_loading_percent: limits.max_loading_percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub sn_mva: f64,
    pub f_hz: f64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            sn_mva: 1.0,
            f_hz: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl GridsimConfig {
    /// Read `path`, or return the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file '{}'", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing config file '{}'", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.simulation_options()?;
        config.log_level()?;
        Ok(config)
    }

    pub fn log_level(&self) -> Result<tracing::Level> {
        self.logging
            .level
            .parse::<tracing::Level>()
            .map_err(|_| anyhow::anyhow!("unknown log level '{}'", self.logging.level))
    }

    /// Library options with these values as the defaults.
    pub fn simulation_options(&self) -> Result<SimulationOptions> {
        let algorithm = self.solver.algorithm.parse::<Algorithm>()?;
        let linear_solver = self.solver.linear_solver.parse::<LinearSolverKind>()?;
        let power_flow = PowerFlowSettings::default()
            .with_algorithm(algorithm)
            .with_max_iterations(self.solver.max_iterations)
            .with_tolerance_mva(self.solver.tolerance_mva)
            .with_linear_solver(linear_solver);
        power_flow.validate()?;
        let limits = ViolationLimits::default()
            .with_voltage_band(self.limits.min_vm_pu, self.limits.max_vm_pu)
            .with_max_loading_percent(self.limits.max_loading_percent);
        Ok(SimulationOptions::default()
            .with_power_flow(power_flow)
            .with_limits(limits)
            .with_system_base(self.system.sn_mva, self.system.f_hz))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = GridsimConfig::parse("").unwrap();
        assert_eq!(config, GridsimConfig::default());
        let options = config.simulation_options().unwrap();
        assert_eq!(options, SimulationOptions::default());
        assert_eq!(config.log_level().unwrap(), tracing::Level::INFO);
        assert!(config.output.pretty);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = GridsimConfig::parse(
            r#"
            [solver]
            algorithm = "gs"
            linear_solver = "gauss"

            [limits]
            max_loading_percent = 80.0

            [system]
            f_hz = 60.0
            "#,
        )
        .unwrap();
        let options = config.simulation_options().unwrap();
        assert_eq!(options.power_flow.algorithm, Algorithm::Gs);
        assert_eq!(options.power_flow.max_iterations, 20);
        assert_eq!(options.power_flow.linear_solver, LinearSolverKind::Gauss);
        assert_eq!(options.limits.max_loading_percent, 80.0);
        assert_eq!(options.limits.min_vm_pu, 0.95);
        assert_eq!(options.f_hz, 60.0);
        assert_eq!(options.sn_mva, 1.0);
    }

    #[test]
    fn bad_values_are_rejected_up_front() {
        assert!(GridsimConfig::parse("[solver]\nalgorithm = \"bfsw\"").is_err());
        assert!(GridsimConfig::parse("[solver]\nlinear_solver = \"lapack\"").is_err());
        assert!(GridsimConfig::parse("[logging]\nlevel = \"loud\"").is_err());
        assert!(GridsimConfig::parse("[solver]\nmax_iterations = \"many\"").is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = GridsimConfig::load(Some(Path::new("/no/such/gridsim.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("/no/such/gridsim.toml"));
    }
}
