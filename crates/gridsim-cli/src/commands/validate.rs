use std::process::ExitCode;

use anyhow::Result;
use gridsim_algo::workflows::simulate::validate;
use gridsim_cli::GridsimConfig;
use gridsim_core::GraphIndex;
use gridsim_io::{read_request, write_json, RequestSource};
use serde_json::json;
use tracing::{info, warn};

/// Exit code when the diagram has findings.
const INVALID: u8 = 2;

pub fn handle(config: &GridsimConfig, request: &str) -> Result<ExitCode> {
    let source = RequestSource::from_arg(request);
    let request = read_request(&source)?;
    let index = GraphIndex::new(&request.nodes, &request.edges);
    let validation = validate(&index);

    let report = json!({
        "valid": validation.is_valid(),
        "errors": validation.errors,
    });
    write_json(&report, None, config.output.pretty)?;

    if validation.is_valid() {
        info!("{} is valid", source);
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("{} has {} finding(s)", source, validation.errors.len());
        Ok(ExitCode::from(INVALID))
    }
}
