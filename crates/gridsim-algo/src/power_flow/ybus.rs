//! Sparse nodal admittance matrix.
//!
//! ```text
//! I = Y × V,   Y[i,j] = G[i,j] + jB[i,j]
//! ```
//!
//! G and B are kept as separate CSR matrices built from the same triplets,
//! so both share one sparsity pattern.

use super::topology::PiBranch;
use num_complex::Complex64;
use sprs::{CsMat, TriMat};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum YBusError {
    #[error("no energized nodes")]
    NoNodes,

    #[error("branch {0:?} has zero impedance")]
    ZeroImpedance(super::topology::BranchOrigin),

    #[error("branch {origin:?} references node {node} outside 0..{n}")]
    UnknownNode {
        origin: super::topology::BranchOrigin,
        node: usize,
        n: usize,
    },
}

#[derive(Debug, Clone)]
pub struct SparseYBus {
    n: usize,
    g_matrix: CsMat<f64>,
    b_matrix: CsMat<f64>,
}

impl SparseYBus {
    /// Assemble Y from π-branches and per-node shunt admittances (both per unit).
    pub fn from_branches(
        n: usize,
        branches: &[PiBranch],
        shunts: &[Complex64],
    ) -> Result<Self, YBusError> {
        if n == 0 {
            return Err(YBusError::NoNodes);
        }
        let mut g_triplet = TriMat::new((n, n));
        let mut b_triplet = TriMat::new((n, n));
        let mut add = |i: usize, j: usize, y: Complex64| {
            g_triplet.add_triplet(i, j, y.re);
            b_triplet.add_triplet(i, j, y.im);
        };

        for br in branches {
            for node in [br.from, br.to] {
                if node >= n {
                    return Err(YBusError::UnknownNode {
                        origin: br.origin,
                        node,
                        n,
                    });
                }
            }
            if !br.y_series.is_finite() || br.y_series.norm() == 0.0 {
                return Err(YBusError::ZeroImpedance(br.origin));
            }
            add(br.from, br.from, br.y_ff());
            add(br.to, br.to, br.y_tt());
            add(br.from, br.to, br.y_ft());
            add(br.to, br.from, br.y_tf());
        }

        // Keep every diagonal present so isolated slack nodes still have a row.
        for (i, y) in shunts.iter().enumerate().take(n) {
            add(i, i, *y);
        }
        for i in shunts.len()..n {
            add(i, i, Complex64::new(0.0, 0.0));
        }

        Ok(Self {
            n,
            g_matrix: g_triplet.to_csr(),
            b_matrix: b_triplet.to_csr(),
        })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn g(&self, i: usize, j: usize) -> f64 {
        self.g_matrix.get(i, j).copied().unwrap_or(0.0)
    }

    pub fn b(&self, i: usize, j: usize) -> f64 {
        self.b_matrix.get(i, j).copied().unwrap_or(0.0)
    }

    pub fn y(&self, i: usize, j: usize) -> Complex64 {
        Complex64::new(self.g(i, j), self.b(i, j))
    }

    pub fn nnz(&self) -> usize {
        self.g_matrix.nnz()
    }

    /// Non-zero entries `(j, Y[i,j])` of row `i`, read straight from the CSR arrays.
    pub fn row_iter(&self, i: usize) -> impl Iterator<Item = (usize, Complex64)> + '_ {
        let g_ptr = self.g_matrix.indptr();
        let b_ptr = self.b_matrix.indptr();
        let (gs, ge) = (g_ptr.index(i), g_ptr.index(i + 1));
        let (bs, be) = (b_ptr.index(i), b_ptr.index(i + 1));
        let cols = &self.g_matrix.indices()[gs..ge];
        let g = &self.g_matrix.data()[gs..ge];
        let b = &self.b_matrix.data()[bs..be];
        cols.iter()
            .zip(g.iter().zip(b.iter()))
            .map(|(&j, (&g, &b))| (j, Complex64::new(g, b)))
    }

    /// Calculated injections `P_i`, `Q_i` at voltages given in polar form.
    pub fn injections(&self, vm: &[f64], va: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let mut p = vec![0.0; self.n];
        let mut q = vec![0.0; self.n];
        for i in 0..self.n {
            for (j, y) in self.row_iter(i) {
                let theta = va[i] - va[j];
                let (s, c) = theta.sin_cos();
                p[i] += vm[i] * vm[j] * (y.re * c + y.im * s);
                q[i] += vm[i] * vm[j] * (y.re * s - y.im * c);
            }
        }
        (p, q)
    }

    /// Complex power injected at every node, `S_i = V_i · conj((Y V)_i)`.
    pub fn complex_injections(&self, v: &[Complex64]) -> Vec<Complex64> {
        (0..self.n)
            .map(|i| {
                let current: Complex64 = self.row_iter(i).map(|(j, y)| y * v[j]).sum();
                v[i] * current.conj()
            })
            .collect()
    }
}
