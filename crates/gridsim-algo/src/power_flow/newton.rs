//! Newton-Raphson load flow in polar coordinates.
//!
//! Unknowns are the angles of all non-slack nodes followed by the magnitudes
//! of PQ nodes. Each iteration solves
//!
//! ```text
//! | J11 J12 | | Δθ |   | ΔP |
//! | J21 J22 | | ΔV | = | ΔQ |
//! ```
//!
//! with `J11 = ∂P/∂θ`, `J12 = ∂P/∂V`, `J21 = ∂Q/∂θ`, `J22 = ∂Q/∂V`.

use super::topology::PowerFlowProblem;
use super::ybus::SparseYBus;
use super::{Algorithm, IterationLimits, LoadFlowEngine, NodeSolution, PowerFlowError};
use gridsim_core::solver::LinearSystemBackend;
use tracing::trace;

#[derive(Debug, Clone, Copy, Default)]
pub struct NewtonRaphson;

/// Largest absolute entry of the stacked `[ΔP; ΔQ]` mismatch.
pub(crate) fn mismatch(
    problem: &PowerFlowProblem,
    vm: &[f64],
    va: &[f64],
    p_buses: &[usize],
    q_buses: &[usize],
) -> (Vec<f64>, f64, Vec<f64>, Vec<f64>) {
    let (p_calc, q_calc) = problem.ybus.injections(vm, va);
    let mut delta = Vec::with_capacity(p_buses.len() + q_buses.len());
    delta.extend(p_buses.iter().map(|&i| problem.p_spec[i] - p_calc[i]));
    delta.extend(q_buses.iter().map(|&i| problem.q_spec[i] - q_calc[i]));
    let max = delta.iter().fold(0.0_f64, |m, d| m.max(d.abs()));
    (delta, max, p_calc, q_calc)
}

/// Dense Jacobian filled from the non-zero pattern of Y.
fn jacobian(
    ybus: &SparseYBus,
    vm: &[f64],
    va: &[f64],
    p_calc: &[f64],
    q_calc: &[f64],
    p_buses: &[usize],
    q_buses: &[usize],
) -> Vec<Vec<f64>> {
    let n = vm.len();
    let n_p = p_buses.len();
    let size = n_p + q_buses.len();
    let mut p_pos = vec![None; n];
    let mut q_pos = vec![None; n];
    for (k, &i) in p_buses.iter().enumerate() {
        p_pos[i] = Some(k);
    }
    for (k, &i) in q_buses.iter().enumerate() {
        q_pos[i] = Some(n_p + k);
    }

    let mut jac = vec![vec![0.0; size]; size];
    for i in 0..n {
        let (row_p, row_q) = (p_pos[i], q_pos[i]);
        if row_p.is_none() {
            continue;
        }
        for (j, y) in ybus.row_iter(i) {
            let (g, b) = (y.re, y.im);
            let (dp_dth, dp_dv, dq_dth, dq_dv) = if i == j {
                (
                    -q_calc[i] - b * vm[i] * vm[i],
                    p_calc[i] / vm[i] + g * vm[i],
                    p_calc[i] - g * vm[i] * vm[i],
                    q_calc[i] / vm[i] - b * vm[i],
                )
            } else {
                let (s, c) = (va[i] - va[j]).sin_cos();
                (
                    vm[i] * vm[j] * (g * s - b * c),
                    vm[i] * (g * c + b * s),
                    -vm[i] * vm[j] * (g * c + b * s),
                    vm[i] * (g * s - b * c),
                )
            };
            if let Some(r) = row_p {
                if let Some(c) = p_pos[j] {
                    jac[r][c] = dp_dth;
                }
                if let Some(c) = q_pos[j] {
                    jac[r][c] = dp_dv;
                }
            }
            if let Some(r) = row_q {
                if let Some(c) = p_pos[j] {
                    jac[r][c] = dq_dth;
                }
                if let Some(c) = q_pos[j] {
                    jac[r][c] = dq_dv;
                }
            }
        }
    }
    jac
}

impl LoadFlowEngine for NewtonRaphson {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Nr
    }

    fn solve(
        &self,
        problem: &PowerFlowProblem,
        limits: IterationLimits,
        linear: &dyn LinearSystemBackend,
    ) -> Result<NodeSolution, PowerFlowError> {
        let mut vm = problem.vm0.clone();
        let mut va = problem.va0.clone();
        let (p_buses, q_buses) = problem.unknowns();
        let n_p = p_buses.len();

        for iter in 0..limits.max_iterations {
            let (delta, max_mismatch, p_calc, q_calc) =
                mismatch(problem, &vm, &va, &p_buses, &q_buses);
            trace!(iteration = iter, max_mismatch, "newton-raphson mismatch");
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

            let jac = jacobian(&problem.ybus, &vm, &va, &p_calc, &q_calc, &p_buses, &q_buses);
            let step = linear.solve(&jac, &delta).map_err(|e| {
                PowerFlowError::SingularJacobian {
                    iteration: iter,
                    reason: e.to_string(),
                }
            })?;

            for (k, &i) in p_buses.iter().enumerate() {
                va[i] += step[k];
            }
            for (k, &i) in q_buses.iter().enumerate() {
                vm[i] += step[n_p + k];
            }
        }

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
