//! # gridsim-core: network data model
//!
//! Data structures shared by the gridsim crates:
//!
//! - [`graph`]: the diagram a client sends (typed nodes, line and attach
//!   edges) and [`GraphIndex`] for category and bus lookups
//! - [`model`]: the electrical model ([`PowerNet`]) with its element tables,
//!   standard-type library, result tables and table export
//! - [`schema`]: request settings and the response payload
//! - [`graph_utils`]: island detection over bus graphs
//! - [`solver`]: dense linear-system backends used by the load-flow engines
//! - [`diagnostics`] and [`error`]: run warnings and run-level errors
//!
//! ```rust
//! use gridsim_core::model::{BusRow, LineOptions, PowerNet};
//!
//! let mut net = PowerNet::default();
//! let a = net.create_bus(BusRow::new("a", 0.4)).unwrap();
//! let b = net.create_bus(BusRow::new("b", 0.4)).unwrap();
//! net.create_line(a, b, 0.1, "NAYY 4x150 SE", LineOptions::default()).unwrap();
//! assert_eq!(net.counts()["line"], 1);
//! ```

pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod graph_utils;
pub mod model;
pub mod schema;
pub mod solver;

pub use diagnostics::{Diagnostics, Warning};
pub use error::{GridError, GridResult};
pub use graph::{
    assign_edge_ids, EdgeData, EdgeKind, ElementKind, GraphEdge, GraphIndex, GraphNode,
    NodeElement, NumField, NumFieldExt,
};
pub use graph_utils::{find_islands, BusGraph, Island};
pub use model::{ModelError, PowerNet};
pub use schema::{
    finite, CreationStatus, ReturnNetwork, RunSettings, SimulationRequest, SimulationResponse,
    ValidationError,
};
