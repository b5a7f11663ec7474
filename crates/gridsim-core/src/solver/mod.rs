//! Dense linear-system backends used by the load-flow engines.

pub mod backend;
pub mod registry;

pub use backend::{FaerSolver, GaussSolver, LinearSystemBackend};
pub use registry::LinearSolverKind;
