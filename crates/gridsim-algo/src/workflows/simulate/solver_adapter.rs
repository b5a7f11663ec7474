//! Narrow bridge between the pipeline and the load-flow engine.

use crate::power_flow::{run_power_flow, PowerFlowError, PowerFlowOutcome, PowerFlowSettings};
use gridsim_core::PowerNet;
use tracing::warn;

/// What the pipeline needs to know about one engine run.
#[derive(Debug)]
pub enum SolverOutcome {
    Converged(PowerFlowOutcome),
    /// Ran to its iteration limit (or diverged) without meeting the tolerance.
    NotConverged(String),
    SolverError(PowerFlowError),
}

impl SolverOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, SolverOutcome::Converged(_))
    }
}

pub fn run(net: &mut PowerNet, settings: &PowerFlowSettings) -> SolverOutcome {
    match run_power_flow(net, settings) {
        Ok(outcome) if outcome.converged => SolverOutcome::Converged(outcome),
        Ok(outcome) => {
            let reason = format!(
                "{} stopped after {} iterations with a mismatch of {:.3e} MVA (tolerance {:.1e} MVA)",
                outcome.algorithm,
                outcome.iterations,
                outcome.max_mismatch_mva,
                settings.tolerance_mva
            );
            warn!(%reason, "load flow did not converge");
            SolverOutcome::NotConverged(reason)
        }
        Err(err) => {
            warn!(error = %err, "load flow failed");
            SolverOutcome::SolverError(err)
        }
    }
}
