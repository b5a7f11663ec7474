use anyhow::{anyhow, Result};
use faer::{prelude::*, solvers::PartialPivLu, Mat};

/// Trait for solving dense linear systems (Ax = b).
///
/// The Newton-Raphson and fast-decoupled engines call this once per
/// iteration with the Jacobian (or B'/B'') and the mismatch vector.
pub trait LinearSystemBackend: Send + Sync {
    /// Solve the linear system Ax = b
    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>>;

    /// Short name used in logs and error messages
    fn name(&self) -> &'static str;
}

fn check_dimensions(matrix: &[Vec<f64>], rhs: &[f64]) -> Result<usize> {
    let n = matrix.len();
    if rhs.len() != n {
        return Err(anyhow!(
            "rhs length ({}) does not match matrix dimension {}",
            rhs.len(),
            n
        ));
    }
    if matrix.iter().any(|row| row.len() != n) {
        return Err(anyhow!("matrix must be square"));
    }
    Ok(n)
}

/// Gaussian elimination with partial pivoting and back substitution.
#[derive(Debug, Clone, Default)]
pub struct GaussSolver;

impl LinearSystemBackend for GaussSolver {
    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>> {
        let n = check_dimensions(matrix, rhs)?;
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut a = matrix.to_vec();
        let mut b = rhs.to_vec();

        for col in 0..n {
            let pivot = (col..n)
                .max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))
                .unwrap_or(col);
            if a[pivot][col].abs() < 1e-12 {
                return Err(anyhow!("singular matrix"));
            }
            a.swap(col, pivot);
            b.swap(col, pivot);

            for row in col + 1..n {
                let factor = a[row][col] / a[col][col];
                if factor == 0.0 {
                    continue;
                }
                let (upper, lower) = a.split_at_mut(row);
                for (target, &p) in lower[0][col..].iter_mut().zip(upper[col][col..].iter()) {
                    *target -= factor * p;
                }
                b[row] -= factor * b[col];
            }
        }

        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let tail: f64 = (i + 1..n).map(|j| a[i][j] * x[j]).sum();
            x[i] = (b[i] - tail) / a[i][i];
        }
        Ok(x)
    }

    fn name(&self) -> &'static str {
        "gauss"
    }
}

/// LU decomposition with partial pivoting from `faer`.
#[derive(Debug, Clone, Default)]
pub struct FaerSolver;

impl LinearSystemBackend for FaerSolver {
    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>> {
        let n = check_dimensions(matrix, rhs)?;
        if n == 0 {
            return Ok(Vec::new());
        }

        let mat = Mat::from_fn(n, n, |i, j| matrix[i][j]);
        let rhs_mat = Mat::from_fn(n, 1, |i, _| rhs[i]);
        let lu = PartialPivLu::new(mat.as_ref());
        let sol = lu.solve(&rhs_mat);

        let solution: Vec<f64> = (0..n).map(|i| sol.read(i, 0)).collect();
        if solution.iter().any(|v| !v.is_finite()) {
            return Err(anyhow!("singular matrix"));
        }
        Ok(solution)
    }

    fn name(&self) -> &'static str {
        "faer"
    }
}
