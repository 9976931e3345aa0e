//! CLI command implementations.

pub mod chain;
pub mod conveyor;
pub mod defect;
pub mod ingest;
pub mod init;
pub mod log;
pub mod status;

use anyhow::Result;

use crate::cli::context::AppContext;
use crate::cli::types::Commands;

/// Run a command that needs an open database.
pub async fn dispatch(command: Commands, ctx: &AppContext, json_mode: bool) -> Result<()> {
    match command {
        Commands::Defect(args) => defect::execute(args, ctx, json_mode).await,
        Commands::Chain(args) => chain::execute(args, ctx, json_mode).await,
        Commands::Status(args) => status::execute(args, ctx, json_mode).await,
        Commands::Conveyor(args) => conveyor::execute(args, ctx, json_mode).await,
        Commands::Log(args) => log::execute(args, ctx, json_mode).await,
        Commands::Ingest(args) => ingest::execute(args, ctx, json_mode).await,
        Commands::Init(_) => anyhow::bail!("init does not run against an open database"),
    }
}
