//! Variation chain CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use futures::TryStreamExt;
use serde::Serialize;

use crate::cli::commands::defect::{DefectListOutput, DefectOutput};
use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::DefectId;

#[derive(Args, Debug)]
pub struct ChainArgs {
    #[command(subcommand)]
    pub command: ChainCommands,
}

#[derive(Subcommand, Debug)]
pub enum ChainCommands {
    /// Mark CURRENT as a later observation of PREVIOUS
    Link { previous: DefectId, current: DefectId },
    /// Remove the link between PREVIOUS and CURRENT
    Unlink { previous: DefectId, current: DefectId },
    /// Show the immediate predecessor of a defect
    Previous { id: DefectId },
    /// Walk the full chain of earlier observations
    Show { id: DefectId },
}

#[derive(Debug, Serialize)]
pub struct LinkOutput {
    pub success: bool,
    pub previous_id: DefectId,
    pub current_id: DefectId,
    pub linked: bool,
}

impl CommandOutput for LinkOutput {
    fn to_human(&self) -> String {
        if self.linked {
            format!("Linked defect {} -> {}", self.current_id, self.previous_id)
        } else {
            format!("Unlinked defect {} -> {}", self.current_id, self.previous_id)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PreviousOutput {
    pub defect_id: DefectId,
    pub previous: Option<DefectOutput>,
}

impl CommandOutput for PreviousOutput {
    fn to_human(&self) -> String {
        match &self.previous {
            Some(previous) => format!("Previous of {}:\n{}", self.defect_id, previous.to_human()),
            None => format!("Defect {} has no earlier observation.", self.defect_id),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChainOutput {
    pub defect_id: DefectId,
    #[serde(flatten)]
    pub chain: DefectListOutput,
}

impl CommandOutput for ChainOutput {
    fn to_human(&self) -> String {
        if self.chain.total == 0 {
            return format!("Defect {} has no earlier observations.", self.defect_id);
        }
        let path: Vec<String> = std::iter::once(self.defect_id)
            .chain(self.chain.defects.iter().map(|d| d.id))
            .map(|id| id.to_string())
            .collect();
        format!("{}\n\n{}", path.join(" -> "), self.chain.to_human())
    }
}

pub async fn execute(args: ChainArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let service = &ctx.defects;

    match args.command {
        ChainCommands::Link { previous, current } => {
            service.link_defect_variation(previous, current).await?;
            output(
                &LinkOutput { success: true, previous_id: previous, current_id: current, linked: true },
                json_mode,
            );
        }
        ChainCommands::Unlink { previous, current } => {
            service.unlink_defect_variation(previous, current).await?;
            output(
                &LinkOutput { success: true, previous_id: previous, current_id: current, linked: false },
                json_mode,
            );
        }
        ChainCommands::Previous { id } => {
            let previous = service.previous_variation(id).await?;
            output(
                &PreviousOutput { defect_id: id, previous: previous.as_ref().map(DefectOutput::from) },
                json_mode,
            );
        }
        ChainCommands::Show { id } => {
            let chain: Vec<_> = service.variation_chain(id).try_collect().await?;
            output(
                &ChainOutput { defect_id: id, chain: DefectListOutput::new(&chain) },
                json_mode,
            );
        }
    }

    Ok(())
}
