use super::backend::{FaerSolver, GaussSolver, LinearSystemBackend};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Registry of available dense linear solvers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinearSolverKind {
    Gauss,
    #[default]
    Faer,
}

impl FromStr for LinearSolverKind {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self> {
        match input.to_ascii_lowercase().as_str() {
            "gauss" => Ok(LinearSolverKind::Gauss),
            "faer" | "default" => Ok(LinearSolverKind::Faer),
            other => Err(anyhow!(
                "unknown linear solver '{}'; supported values: {}",
                other,
                Self::available().join(", ")
            )),
        }
    }
}

impl LinearSolverKind {
    pub fn build_solver(self) -> Arc<dyn LinearSystemBackend> {
        match self {
            LinearSolverKind::Gauss => Arc::new(GaussSolver),
            LinearSolverKind::Faer => Arc::new(FaerSolver),
        }
    }

    pub fn available() -> &'static [&'static str] {
        &["gauss", "faer"]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LinearSolverKind::Gauss => "gauss",
            LinearSolverKind::Faer => "faer",
        }
    }
}
