//! CLI type definitions
//!
//! Top-level clap structures; each command's arguments live next to its
//! implementation under `commands/`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::commands::{
    chain::ChainArgs, conveyor::ConveyorArgs, defect::DefectArgs, ingest::IngestArgs,
    init::InitArgs, log::LogArgs, status::StatusArgs,
};

#[derive(Parser, Debug)]
#[command(name = "beltmon")]
#[command(about = "Belt conveyor defect monitoring", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .beltmon/config.yaml + .beltmon/local.yaml)
    #[arg(long, global = true, env = "BELTMON_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration and database
    Init(InitArgs),

    /// Defect inspection and maintenance
    Defect(DefectArgs),

    /// Variation chain management
    Chain(ChainArgs),

    /// Conveyor status
    Status(StatusArgs),

    /// Conveyor parameters
    Conveyor(ConveyorArgs),

    /// Action log
    Log(LogArgs),

    /// Feed newline-delimited JSON detections through the detection listener
    Ingest(IngestArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["beltmon", "status", "show", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Status(_)));
    }
}
