//! Gauss-Seidel load flow.
//!
//! Each sweep updates every non-slack node in turn with
//! `V_i = (conj(S_i / V_i) - Σ_{j≠i} Y_ij V_j) / Y_ii`, using the newest
//! values of already visited nodes. PV nodes take their reactive injection
//! from the current state and are pulled back onto their magnitude setpoint.
//! No linear solves are needed, so the backend is unused.

use super::newton::mismatch;
use super::topology::{BusKind, PowerFlowProblem};
use super::{Algorithm, IterationLimits, LoadFlowEngine, NodeSolution, PowerFlowError};
use gridsim_core::solver::LinearSystemBackend;
use num_complex::Complex64;
use tracing::trace;

#[derive(Debug, Clone, Copy)]
pub struct GaussSeidel {
    /// Over-relaxation factor applied to PQ updates.
    acceleration: f64,
}

impl Default for GaussSeidel {
    fn default() -> Self {
        Self { acceleration: 1.0 }
    }
}

impl GaussSeidel {
    pub fn with_acceleration(mut self, acceleration: f64) -> Self {
        self.acceleration = acceleration;
        self
    }

    fn sweep(&self, problem: &PowerFlowProblem, v: &mut [Complex64]) -> Result<(), PowerFlowError> {
        for i in 0..problem.n() {
            if problem.kind[i] == BusKind::Slack {
                continue;
            }
            let mut y_ii = Complex64::new(0.0, 0.0);
            let mut others = Complex64::new(0.0, 0.0);
            for (j, y) in problem.ybus.row_iter(i) {
                if j == i {
                    y_ii += y;
                } else {
                    others += y * v[j];
                }
            }
            if y_ii.norm() < 1e-12 {
                return Err(PowerFlowError::InvalidModel(format!(
                    "node {} has no self admittance",
                    problem.node_of[i]
                )));
            }

            let q = match problem.kind[i] {
                BusKind::Pv => (v[i] * (y_ii * v[i] + others).conj()).im,
                _ => problem.q_spec[i],
            };
            let s = Complex64::new(problem.p_spec[i], q);
            let updated = ((s / v[i]).conj() - others) / y_ii;

            v[i] = match problem.kind[i] {
                BusKind::Pv => Complex64::from_polar(problem.vm0[i], updated.arg()),
                _ => v[i] + (updated - v[i]) * self.acceleration,
            };
        }
        Ok(())
    }
}

impl LoadFlowEngine for GaussSeidel {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Gs
    }

    fn solve(
        &self,
        problem: &PowerFlowProblem,
        limits: IterationLimits,
        _linear: &dyn LinearSystemBackend,
    ) -> Result<NodeSolution, PowerFlowError> {
        let (p_buses, q_buses) = problem.unknowns();
        let mut v: Vec<Complex64> = problem
            .vm0
            .iter()
            .zip(problem.va0.iter())
            .map(|(&m, &a)| Complex64::from_polar(m, a))
            .collect();
        let polar = |v: &[Complex64]| -> (Vec<f64>, Vec<f64>) {
            (v.iter().map(|x| x.norm()).collect(), v.iter().map(|x| x.arg()).collect())
        };

        for iter in 0..limits.max_iterations {
            let (vm, va) = polar(&v);
            let (_, max_mismatch, _, _) = mismatch(problem, &vm, &va, &p_buses, &q_buses);
            trace!(iteration = iter, max_mismatch, "gauss-seidel mismatch");
            if max_mismatch < limits.tolerance_pu {
                return Ok(NodeSolution {
                    vm,
                    va,
                    converged: true,
                    iterations: iter,
                    max_mismatch,
                });
            }
            if !max_mismatch.is_finite() {
                break;
            }
            self.sweep(problem, &mut v)?;
        }

        let (vm, va) = polar(&v);
        let (_, max_mismatch, _, _) = mismatch(problem, &vm, &va, &p_buses, &q_buses);
        Ok(NodeSolution {
            converged: max_mismatch < limits.tolerance_pu,
            vm,
            va,
            iterations: limits.max_iterations,
            max_mismatch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power_flow::newton::tests::{limits, three_node_problem};
    use crate::power_flow::newton::NewtonRaphson;
    use gridsim_core::solver::GaussSolver;

    #[test]
    fn converges_to_newton_solution() {
        let problem = three_node_problem();
        let reference = NewtonRaphson.solve(&problem, limits(), &GaussSolver).unwrap();
        let sweeps = IterationLimits {
            max_iterations: 500,
            tolerance_pu: 1e-8,
        };
        let sol = GaussSeidel::default()
            .solve(&problem, sweeps, &GaussSolver)
            .unwrap();
        assert!(sol.converged);
        for i in 0..3 {
            assert!((sol.vm[i] - reference.vm[i]).abs() < 1e-6);
            assert!((sol.va[i] - reference.va[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn pv_magnitude_is_held() {
        let problem = three_node_problem();
        let sweeps = IterationLimits {
            max_iterations: 3,
            tolerance_pu: 1e-12,
        };
        let sol = GaussSeidel::default()
            .with_acceleration(1.2)
            .solve(&problem, sweeps, &GaussSolver)
            .unwrap();
        assert!((sol.vm[2] - 1.01).abs() < 1e-12);
        assert_eq!(sol.vm[0], 1.02);
    }
}
