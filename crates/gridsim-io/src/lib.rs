//! # gridsim-io: request and response I/O
//!
//! - [`request`]: read a [`SimulationRequest`](gridsim_core::SimulationRequest)
//!   from a file, stdin or a string, giving every edge an id
//! - [`response`]: write any serializable payload as pretty or compact JSON
//!
//! ```rust,no_run
//! use gridsim_io::request::{read_request, RequestSource};
//!
//! fn main() -> anyhow::Result<()> {
//!     let request = read_request(&RequestSource::from_arg("network.json"))?;
//!     println!("{} nodes", request.nodes.len());
//!     Ok(())
//! }
//! ```

pub mod request;
pub mod response;

pub use request::{parse_request, read_request, RequestSource};
pub use response::{to_json_string, write_json};
