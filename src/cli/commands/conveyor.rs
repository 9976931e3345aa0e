//! Conveyor parameter CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{ConveyorParameters, ConveyorParametersUpdate};

#[derive(Args, Debug)]
pub struct ConveyorArgs {
    #[command(subcommand)]
    pub command: ConveyorCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConveyorCommands {
    /// Show belt parameters
    Show,
    /// Update belt parameters; omitted values are kept
    Update {
        /// Belt length, mm
        #[arg(long)]
        length: Option<i64>,
        /// Belt width, mm
        #[arg(long)]
        width: Option<i64>,
        /// Belt thickness, mm
        #[arg(long)]
        thickness: Option<i64>,
    },
}

#[derive(Debug, Serialize)]
pub struct ParametersOutput {
    #[serde(flatten)]
    pub parameters: ConveyorParameters,
}

impl CommandOutput for ParametersOutput {
    fn to_human(&self) -> String {
        format!(
            "Belt length: {} mm\nBelt width: {} mm\nBelt thickness: {} mm",
            self.parameters.belt_length_mm, self.parameters.belt_width_mm, self.parameters.belt_thickness_mm
        )
    }
}

pub async fn execute(args: ConveyorArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let parameters = match args.command {
        ConveyorCommands::Show => ctx.parameters.conveyor_parameters().await?,
        ConveyorCommands::Update { length, width, thickness } => {
            let update = ConveyorParametersUpdate {
                belt_length_mm: length,
                belt_width_mm: width,
                belt_thickness_mm: thickness,
            };
            if update.is_empty() {
                anyhow::bail!("Nothing to update. Pass --length, --width or --thickness.");
            }
            ctx.parameters.update_conveyor_parameters(update).await?
        }
    };

    output(&ParametersOutput { parameters }, json_mode);
    Ok(())
}
