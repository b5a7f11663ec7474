//! # gridsim-algo: load flow and the simulation pipeline
//!
//! ## Load flow
//!
//! [`run_power_flow`] solves a [`PowerNet`](gridsim_core::PowerNet) in place
//! with one of four engines selected through [`Algorithm`]:
//!
//! | Algorithm | Method |
//! |-----------|--------|
//! | `nr`   | Newton-Raphson with the full polar Jacobian |
//! | `fdbx` | Fast-decoupled, BX variant |
//! | `fdxb` | Fast-decoupled, XB variant |
//! | `gs`   | Gauss-Seidel |
//!
//! Non-convergence is reported through [`PowerFlowOutcome::converged`], not
//! as an error.
//!
//! ## Simulation pipeline
//!
//! [`simulate`] turns a diagram request into a response: validation,
//! assembly, load flow, result collection and limit checks. See
//! [`workflows::simulate`].
//!
//! ```ignore
//! use gridsim_algo::{simulate, SimulationOptions};
//!
//! let request: gridsim_core::SimulationRequest = serde_json::from_str(json)?;
//! let response = simulate(&request, &SimulationOptions::default());
//! println!("converged: {}", response.summary.converged);
//! ```

pub mod power_flow;
pub mod workflows;

pub use power_flow::{
    run_power_flow, Algorithm, LoadFlowEngine, PowerFlowError, PowerFlowOutcome,
    PowerFlowSettings,
};
pub use workflows::simulate::{simulate, SimulationOptions, SolverOutcome, ViolationLimits};
