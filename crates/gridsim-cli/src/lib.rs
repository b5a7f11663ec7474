pub mod cli;
pub mod config;

pub use cli::{Cli, Commands, NetworkDetail, StdTypeKind};
pub use config::GridsimConfig;
