use clap::Parser;
use gridsim_cli::{Cli, Commands, GridsimConfig};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

mod commands;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // The config is read before the subscriber exists, so its failure is
    // reported on stderr directly.
    let config = match GridsimConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    let level = cli
        .log_level
        .or_else(|| config.log_level().ok())
        .unwrap_or(tracing::Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: logging disabled: {e}");
    }

    let result = match &cli.command {
        Commands::Simulate {
            request,
            out,
            algorithm,
            return_network,
            compact,
        } => commands::simulate::handle(
            &config,
            request,
            out.as_deref(),
            *algorithm,
            *return_network,
            *compact,
        ),
        Commands::Validate { request } => commands::validate::handle(&config, request),
        Commands::StdTypes { kind } => commands::std_types::handle(&config, *kind),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
