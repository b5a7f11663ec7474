//! Fast-decoupled load flow (Stott-Alsac) in its XB and BX variants.
//!
//! The P-θ and Q-V subproblems are solved alternately with constant
//! matrices:
//!
//! ```text
//! ΔP / V = B'  Δθ
//! ΔQ / V = B'' ΔV
//! ```
//!
//! B' ignores shunts and off-nominal taps, B'' keeps both. XB drops branch
//! resistance from B', BX drops it from B''.
//!
//! - Stott & Alsac (1974): "Fast Decoupled Load Flow", IEEE Trans. PAS 93(3)
//! - van Amerongen (1989): "A general-purpose version of the fast decoupled
//!   loadflow", IEEE Trans. Power Systems 4(2)

use super::newton::mismatch;
use super::topology::PowerFlowProblem;
use super::{Algorithm, IterationLimits, LoadFlowEngine, NodeSolution, PowerFlowError};
use gridsim_core::solver::LinearSystemBackend;
use num_complex::Complex64;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Xb,
    Bx,
}

#[derive(Debug, Clone, Copy)]
pub struct FastDecoupled {
    variant: Variant,
}

impl FastDecoupled {
    pub fn xb() -> Self {
        Self {
            variant: Variant::Xb,
        }
    }

    pub fn bx() -> Self {
        Self {
            variant: Variant::Bx,
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }
}

/// `-Im(Y)` of a simplified admittance matrix over all problem nodes.
fn susceptance_matrix(problem: &PowerFlowProblem, drop_resistance: bool, full_model: bool) -> Vec<Vec<f64>> {
    let n = problem.n();
    let mut b = vec![vec![0.0; n]; n];
    for br in &problem.branches {
        let z = br.y_series.inv();
        let y = if drop_resistance {
            Complex64::new(0.0, z.im.abs().max(1e-6)).inv()
        } else {
            br.y_series
        };
        let (tau, sh_from, sh_to) = if full_model {
            (br.tau, br.y_shunt_from, br.y_shunt_to)
        } else {
            (1.0, Complex64::new(0.0, 0.0), Complex64::new(0.0, 0.0))
        };
        let (i, j) = (br.from, br.to);
        b[i][i] -= ((y + sh_from) / (tau * tau)).im;
        b[j][j] -= (y + sh_to).im;
        b[i][j] += (y / tau).im;
        b[j][i] += (y / tau).im;
    }
    if full_model {
        for (i, y) in problem.shunts.iter().enumerate() {
            b[i][i] -= y.im;
        }
    }
    b
}

fn submatrix(full: &[Vec<f64>], idx: &[usize]) -> Vec<Vec<f64>> {
    idx.iter()
        .map(|&i| idx.iter().map(|&j| full[i][j]).collect())
        .collect()
}

/// B' over the non-slack nodes and B'' over the PQ nodes.
pub fn build_b_matrices(
    problem: &PowerFlowProblem,
    variant: Variant,
    p_buses: &[usize],
    q_buses: &[usize],
) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let b_prime = susceptance_matrix(problem, variant == Variant::Xb, false);
    let b_double_prime = susceptance_matrix(problem, variant == Variant::Bx, true);
    (submatrix(&b_prime, p_buses), submatrix(&b_double_prime, q_buses))
}

impl LoadFlowEngine for FastDecoupled {
    fn algorithm(&self) -> Algorithm {
        match self.variant {
            Variant::Xb => Algorithm::Fdxb,
            Variant::Bx => Algorithm::Fdbx,
        }
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
        let (b_prime, b_double_prime) = build_b_matrices(problem, self.variant, &p_buses, &q_buses);
        let backend_err = |e: anyhow::Error| PowerFlowError::Backend {
            backend: linear.name(),
            reason: e.to_string(),
        };

        let done = |vm: Vec<f64>, va: Vec<f64>, iterations: usize, max_mismatch: f64| {
            Ok(NodeSolution {
                vm,
                va,
                converged: true,
                iterations,
                max_mismatch,
            })
        };

        for iter in 0..limits.max_iterations {
            let (delta, max_mismatch, _, _) = mismatch(problem, &vm, &va, &p_buses, &q_buses);
            trace!(iteration = iter, max_mismatch, "fast-decoupled mismatch");
            if max_mismatch < limits.tolerance_pu {
                return done(vm, va, iter, max_mismatch);
            }
            if !max_mismatch.is_finite() {
                break;
            }

            let rhs: Vec<f64> = p_buses
                .iter()
                .enumerate()
                .map(|(k, &i)| delta[k] / vm[i])
                .collect();
            let d_theta = linear.solve(&b_prime, &rhs).map_err(backend_err)?;
            for (k, &i) in p_buses.iter().enumerate() {
                va[i] += d_theta[k];
            }

            if q_buses.is_empty() {
                continue;
            }
            let (delta, max_mismatch, _, _) = mismatch(problem, &vm, &va, &p_buses, &q_buses);
            if max_mismatch < limits.tolerance_pu {
                return done(vm, va, iter + 1, max_mismatch);
            }
            let rhs: Vec<f64> = q_buses
                .iter()
                .enumerate()
                .map(|(k, &i)| delta[n_p + k] / vm[i])
                .collect();
            let d_vm = linear.solve(&b_double_prime, &rhs).map_err(backend_err)?;
            for (k, &i) in q_buses.iter().enumerate() {
                vm[i] += d_vm[k];
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power_flow::newton::tests::{limits, three_node_problem};
    use crate::power_flow::newton::NewtonRaphson;
    use gridsim_core::solver::FaerSolver;

    #[test]
    fn b_prime_rows_sum_to_zero() {
        let problem = three_node_problem();
        let (p_buses, q_buses) = problem.unknowns();
        let full = susceptance_matrix(&problem, true, false);
        for row in &full {
            assert!(row.iter().sum::<f64>().abs() < 1e-9);
        }
        let (bp, bpp) = build_b_matrices(&problem, Variant::Xb, &p_buses, &q_buses);
        assert_eq!(bp.len(), 2);
        assert_eq!(bpp.len(), 1);
        assert!(bp[0][0] > 0.0 && bp[0][1] < 0.0);
    }

    #[test]
    fn both_variants_match_newton() {
        let problem = three_node_problem();
        let reference = NewtonRaphson.solve(&problem, limits(), &FaerSolver).unwrap();
        let generous = IterationLimits {
            max_iterations: 100,
            ..limits()
        };
        for engine in [FastDecoupled::xb(), FastDecoupled::bx()] {
            let sol = engine.solve(&problem, generous, &FaerSolver).unwrap();
            assert!(sol.converged, "{:?} did not converge", engine.variant());
            for i in 0..3 {
                assert!((sol.vm[i] - reference.vm[i]).abs() < 1e-6);
                assert!((sol.va[i] - reference.va[i]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn variants_report_their_algorithm() {
        assert_eq!(FastDecoupled::xb().algorithm(), Algorithm::Fdxb);
        assert_eq!(FastDecoupled::bx().algorithm(), Algorithm::Fdbx);
    }
}
