use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use gridsim_algo::{simulate, Algorithm};
use gridsim_cli::{GridsimConfig, NetworkDetail};
use gridsim_io::{read_request, write_json, RequestSource};
use tracing::info;

/// Produces a response whenever the request parses; errors inside the
/// response do not change the exit code.
pub fn handle(
    config: &GridsimConfig,
    request: &str,
    out: Option<&Path>,
    algorithm: Option<Algorithm>,
    return_network: Option<NetworkDetail>,
    compact: bool,
) -> Result<ExitCode> {
    let source = RequestSource::from_arg(request);
    let mut request = read_request(&source)?;
    if let Some(algorithm) = algorithm {
        request.settings.algorithm = Some(algorithm.to_string());
    }
    if let Some(detail) = return_network {
        request.settings.return_network = Some(detail.into());
    }

    let options = config.simulation_options()?;
    info!("Simulating {} ({} nodes)", source, request.nodes.len());
    let response = simulate(&request, &options);

    write_json(&response, out, config.output.pretty && !compact)?;
    if let Some(path) = out {
        info!("Response written to {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}
