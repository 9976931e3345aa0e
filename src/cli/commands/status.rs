//! Conveyor status CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::display::{colorize_criticality, list_table, render_list};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{ConveyorStatusRecord, Criticality, StatusRecordId};

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(subcommand)]
    pub command: StatusCommands,
}

#[derive(Subcommand, Debug)]
pub enum StatusCommands {
    /// Show the current conveyor status
    Show,
    /// Recompute the status from all stored defects
    Recompute,
    /// Show past status changes, newest first
    History {
        /// Maximum number of entries
        #[arg(short, long)]
        limit: Option<u32>,
    },
}

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub id: StatusRecordId,
    pub criticality: Criticality,
    pub is_extreme: bool,
    pub is_critical: bool,
    pub recorded_at: String,
}

impl From<&ConveyorStatusRecord> for StatusOutput {
    fn from(record: &ConveyorStatusRecord) -> Self {
        Self {
            id: record.id,
            criticality: record.criticality(),
            is_extreme: record.severity.is_extreme(),
            is_critical: record.severity.is_critical(),
            recorded_at: record.recorded_at.to_rfc3339(),
        }
    }
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        format!(
            "Conveyor status: {} (since {})",
            colorize_criticality(self.criticality),
            self.recorded_at
        )
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryOutput {
    pub history: Vec<StatusOutput>,
    pub total: usize,
}

impl CommandOutput for HistoryOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "status", "recorded"]);
        for entry in &self.history {
            table.add_row(vec![
                entry.id.to_string(),
                colorize_criticality(entry.criticality).to_string(),
                entry.recorded_at.clone(),
            ]);
        }
        render_list("status change", &table, self.total)
    }
}

pub async fn execute(args: StatusArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let service = &ctx.defects;

    match args.command {
        StatusCommands::Show => {
            let record = service.current_conveyor_status().await?;
            output(&StatusOutput::from(&record), json_mode);
        }
        StatusCommands::Recompute => {
            let record = service.recompute_conveyor_status().await?;
            output(&StatusOutput::from(&record), json_mode);
        }
        StatusCommands::History { limit } => {
            let records = service.status_history(limit).await?;
            let history: Vec<StatusOutput> = records.iter().map(StatusOutput::from).collect();
            let total = history.len();
            output(&HistoryOutput { history, total }, json_mode);
        }
    }

    Ok(())
}
