//! High-level entry points that chain the model, the validator and the
//! load-flow engines into complete runs.

pub mod simulate;

pub use simulate::{simulate, SimulationOptions, ViolationLimits};
