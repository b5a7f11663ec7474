//! Request ingestion.

use anyhow::{Context, Result};
use gridsim_core::{assign_edge_ids, SimulationRequest};
use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::debug;

/// Where a request document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestSource {
    File(PathBuf),
    Stdin,
}

impl RequestSource {
    /// `-` means stdin, anything else is a path.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            RequestSource::Stdin
        } else {
            RequestSource::File(PathBuf::from(arg))
        }
    }
}

impl fmt::Display for RequestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestSource::File(path) => write!(f, "'{}'", path.display()),
            RequestSource::Stdin => f.write_str("stdin"),
        }
    }
}

pub fn read_request(source: &RequestSource) -> Result<SimulationRequest> {
    let content = match source {
        RequestSource::File(path) => fs::read_to_string(path)
            .with_context(|| format!("reading request file '{}'", path.display()))?,
        RequestSource::Stdin => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading request from stdin")?;
            buf
        }
    };
    parse_request(&content).with_context(|| format!("parsing request from {source}"))
}

/// Parse a request document and give every edge without an id the
/// synthetic id `edge_{position}`.
pub fn parse_request(content: &str) -> Result<SimulationRequest> {
    let mut request: SimulationRequest =
        serde_json::from_str(content).context("request is not a valid simulation document")?;
    assign_edge_ids(&mut request.edges);
    debug!(
        nodes = request.nodes.len(),
        edges = request.edges.len(),
        "request parsed"
    );
    Ok(request)
}
