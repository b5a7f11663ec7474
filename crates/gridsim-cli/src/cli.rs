use clap::{Parser, Subcommand, ValueEnum, ValueHint};
use gridsim_algo::Algorithm;
use gridsim_core::ReturnNetwork;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Load-flow simulation of drawn power networks", long_about = None)]
pub struct Cli {
    /// Set the logging level (overrides `[logging] level` from the config)
    #[arg(long, global = true)]
    pub log_level: Option<tracing::Level>,

    /// TOML configuration file
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build, solve and check a network diagram
    Simulate {
        /// Request file, or `-` for stdin
        #[arg(value_hint = ValueHint::FilePath)]
        request: String,

        /// Write the response here instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,

        /// Load-flow algorithm, taking precedence over the request settings
        #[arg(long, value_parser = parse_algorithm)]
        algorithm: Option<Algorithm>,

        /// How much of the assembled network to include in the response
        #[arg(long, value_enum)]
        return_network: Option<NetworkDetail>,

        /// Single-line JSON output
        #[arg(long)]
        compact: bool,
    },
    /// Check a diagram without solving it
    Validate {
        /// Request file, or `-` for stdin
        #[arg(value_hint = ValueHint::FilePath)]
        request: String,
    },
    /// List the standard-type library
    StdTypes {
        /// Only this family
        #[arg(long, value_enum)]
        kind: Option<StdTypeKind>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum NetworkDetail {
    None,
    Summary,
    Tables,
}

impl From<NetworkDetail> for ReturnNetwork {
    fn from(detail: NetworkDetail) -> Self {
        match detail {
            NetworkDetail::None => ReturnNetwork::None,
            NetworkDetail::Summary => ReturnNetwork::Summary,
            NetworkDetail::Tables => ReturnNetwork::Tables,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StdTypeKind {
    Line,
    Trafo,
    Trafo3w,
}

fn parse_algorithm(value: &str) -> Result<Algorithm, String> {
    value.parse::<Algorithm>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn simulate_flags_parse() {
        let cli = Cli::try_parse_from([
            "gridsim",
            "--log-level",
            "debug",
            "simulate",
            "-",
            "--algorithm",
            "FDXB",
            "--return-network",
            "tables",
            "--compact",
        ])
        .unwrap();
        assert_eq!(cli.log_level, Some(tracing::Level::DEBUG));
        match cli.command {
            Commands::Simulate {
                request,
                algorithm,
                return_network,
                compact,
                out,
            } => {
                assert_eq!(request, "-");
                assert_eq!(algorithm, Some(Algorithm::Fdxb));
                assert_eq!(return_network, Some(NetworkDetail::Tables));
                assert!(compact);
                assert!(out.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn unknown_algorithm_is_a_usage_error() {
        let err = Cli::try_parse_from(["gridsim", "simulate", "net.json", "--algorithm", "bfsw"])
            .unwrap_err();
        assert!(err.to_string().contains("bfsw"));
    }
}
