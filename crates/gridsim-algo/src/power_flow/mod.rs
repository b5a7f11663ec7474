//! AC load flow on a [`PowerNet`].
//!
//! [`run_power_flow`] reduces the network to its energized nodes
//! ([`topology`]), solves it with the selected [`LoadFlowEngine`] and, on
//! convergence, writes the `res_*` tables ([`results`]).
//!
//! Engines:
//! - [`newton::NewtonRaphson`] (`nr`): full polar Jacobian
//! - [`fast_decoupled::FastDecoupled`] (`fdbx`, `fdxb`): constant B′/B″
//! - [`gauss_seidel::GaussSeidel`] (`gs`): nodal voltage sweeps

pub mod fast_decoupled;
pub mod gauss_seidel;
pub mod newton;
pub mod results;
pub mod topology;
pub mod ybus;

use gridsim_core::model::PowerNet;
use gridsim_core::solver::{LinearSolverKind, LinearSystemBackend};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};
use web_time::Instant;

pub use topology::{BusKind, PowerFlowProblem, Topology};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Newton-Raphson.
    Nr,
    /// Fast-decoupled, BX variant.
    Fdbx,
    /// Fast-decoupled, XB variant.
    Fdxb,
    /// Gauss-Seidel.
    Gs,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [Algorithm::Nr, Algorithm::Fdbx, Algorithm::Fdxb, Algorithm::Gs];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Nr => "nr",
            Algorithm::Fdbx => "fdbx",
            Algorithm::Fdxb => "fdxb",
            Algorithm::Gs => "gs",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = PowerFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nr" => Ok(Algorithm::Nr),
            "fdbx" => Ok(Algorithm::Fdbx),
            "fdxb" => Ok(Algorithm::Fdxb),
            "gs" => Ok(Algorithm::Gs),
            _ => Err(PowerFlowError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum PowerFlowError {
    #[error("unsupported algorithm '{0}' (expected one of nr, fdbx, fdxb, gs)")]
    UnsupportedAlgorithm(String),

    #[error("no in-service ext_grid on an energized bus")]
    NoSlack,

    #[error("singular Jacobian at iteration {iteration}: {reason}")]
    SingularJacobian { iteration: usize, reason: String },

    #[error("invalid solver settings: {0}")]
    InvalidSettings(String),

    #[error("invalid network model: {0}")]
    InvalidModel(String),

    #[error("{backend} linear solver failed: {reason}")]
    Backend {
        backend: &'static str,
        reason: String,
    },
}

/// Solver settings of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerFlowSettings {
    pub algorithm: Algorithm,
    pub max_iterations: usize,
    /// Largest accepted power mismatch, MVA.
    pub tolerance_mva: f64,
    pub linear_solver: LinearSolverKind,
}

impl Default for PowerFlowSettings {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Nr,
            max_iterations: 20,
            tolerance_mva: 1e-6,
            linear_solver: LinearSolverKind::default(),
        }
    }
}

impl PowerFlowSettings {
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance_mva(mut self, tolerance_mva: f64) -> Self {
        self.tolerance_mva = tolerance_mva;
        self
    }

    pub fn with_linear_solver(mut self, linear_solver: LinearSolverKind) -> Self {
        self.linear_solver = linear_solver;
        self
    }

    pub fn validate(&self) -> Result<(), PowerFlowError> {
        if self.max_iterations == 0 {
            return Err(PowerFlowError::InvalidSettings(
                "max_iter must be at least 1".to_string(),
            ));
        }
        if !(self.tolerance_mva.is_finite() && self.tolerance_mva > 0.0) {
            return Err(PowerFlowError::InvalidSettings(format!(
                "tolerance_mva must be > 0, got {}",
                self.tolerance_mva
            )));
        }
        Ok(())
    }
}

/// Iteration limits handed to an engine, with the tolerance in per unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationLimits {
    pub max_iterations: usize,
    pub tolerance_pu: f64,
}

/// Node voltages produced by an engine, in compact node numbering.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSolution {
    pub vm: Vec<f64>,
    /// Radians.
    pub va: Vec<f64>,
    pub converged: bool,
    pub iterations: usize,
    /// Largest remaining mismatch, per unit.
    pub max_mismatch: f64,
}

impl NodeSolution {
    pub(crate) fn is_physical(&self) -> bool {
        self.vm.iter().all(|v| v.is_finite() && *v > 0.0) && self.va.iter().all(|a| a.is_finite())
    }
}

/// A load-flow method over a prepared [`PowerFlowProblem`].
pub trait LoadFlowEngine {
    fn algorithm(&self) -> Algorithm;

    fn solve(
        &self,
        problem: &PowerFlowProblem,
        limits: IterationLimits,
        linear: &dyn LinearSystemBackend,
    ) -> Result<NodeSolution, PowerFlowError>;
}

pub fn engine_for(algorithm: Algorithm) -> Box<dyn LoadFlowEngine> {
    match algorithm {
        Algorithm::Nr => Box::new(newton::NewtonRaphson),
        Algorithm::Fdbx => Box::new(fast_decoupled::FastDecoupled::bx()),
        Algorithm::Fdxb => Box::new(fast_decoupled::FastDecoupled::xb()),
        Algorithm::Gs => Box::new(gauss_seidel::GaussSeidel::default()),
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerFlowOutcome {
    pub algorithm: Algorithm,
    pub converged: bool,
    pub iterations: usize,
    pub max_mismatch_mva: f64,
    pub energized_nodes: usize,
    pub deenergized_nodes: usize,
}

/// Solve the network in place.
///
/// On convergence the result tables are filled and `net.converged` is set.
/// A run that exhausts its iterations (or diverges to non-physical voltages)
/// returns `Ok` with `converged == false` and leaves the tables empty.
pub fn run_power_flow(
    net: &mut PowerNet,
    settings: &PowerFlowSettings,
) -> Result<PowerFlowOutcome, PowerFlowError> {
    settings.validate()?;
    net.clear_results();
    let start = Instant::now();

    let topology = Topology::build(net);
    if !topology.has_slack() {
        return Err(PowerFlowError::NoSlack);
    }
    let problem = topology.problem()?;
    let energized_nodes = problem.n();
    let deenergized_nodes = topology.node_count - energized_nodes;
    if deenergized_nodes > 0 {
        warn!(deenergized_nodes, "nodes without a path to an ext_grid are left unsolved");
    }

    let limits = IterationLimits {
        max_iterations: settings.max_iterations,
        tolerance_pu: settings.tolerance_mva / net.sn_mva,
    };
    let backend = settings.linear_solver.build_solver();
    let engine = engine_for(settings.algorithm);
    debug!(
        algorithm = %settings.algorithm,
        nodes = energized_nodes,
        branches = problem.branches.len(),
        nnz = problem.ybus.nnz(),
        linear_solver = backend.name(),
        "starting load flow"
    );

    let solution = engine.solve(&problem, limits, backend.as_ref())?;
    let converged = solution.converged && solution.is_physical();

    if converged {
        results::write_results(net, &topology, &problem, &solution);
        net.converged = true;
    }

    let outcome = PowerFlowOutcome {
        algorithm: settings.algorithm,
        converged,
        iterations: solution.iterations,
        max_mismatch_mva: solution.max_mismatch * net.sn_mva,
        energized_nodes,
        deenergized_nodes,
    };
    info!(
        algorithm = %outcome.algorithm,
        converged,
        iterations = outcome.iterations,
        max_mismatch_mva = outcome.max_mismatch_mva,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "load flow finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_names_round_trip() {
        for alg in Algorithm::ALL {
            assert_eq!(alg.as_str().parse::<Algorithm>().unwrap(), alg);
        }
        assert_eq!(" NR ".parse::<Algorithm>().unwrap(), Algorithm::Nr);
        let err = "bfsw".parse::<Algorithm>().unwrap_err();
        assert!(err.to_string().contains("bfsw"));
    }

    #[test]
    fn settings_are_validated() {
        assert!(PowerFlowSettings::default().validate().is_ok());
        let zero_iter = PowerFlowSettings::default().with_max_iterations(0);
        assert!(matches!(
            zero_iter.validate(),
            Err(PowerFlowError::InvalidSettings(_))
        ));
        let bad_tol = PowerFlowSettings::default().with_tolerance_mva(-1.0);
        assert!(bad_tol.validate().is_err());
    }

    #[test]
    fn network_without_ext_grid_has_no_slack() {
        use gridsim_core::model::BusRow;
        let mut net = PowerNet::default();
        net.create_bus(BusRow::new("a", 20.0)).unwrap();
        let err = run_power_flow(&mut net, &PowerFlowSettings::default()).unwrap_err();
        assert!(matches!(err, PowerFlowError::NoSlack));
        assert!(!net.converged);
    }
}
