//! Action log CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::display::{colorize_category, list_table, render_list};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{LogCategory, LogRecord, LogRecordId};

#[derive(Args, Debug)]
pub struct LogArgs {
    #[command(subcommand)]
    pub command: LogCommands,
}

#[derive(Subcommand, Debug)]
pub enum LogCommands {
    /// List log entries, newest first
    List {
        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,
        /// Maximum number of entries
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Show one log entry
    Show { id: LogRecordId },
    /// Delete one log entry
    Delete {
        id: LogRecordId,
        /// Do not record the deletion in the log
        #[arg(long)]
        quiet: bool,
    },
    /// Delete every log entry
    Clear {
        /// Do not record the deletion in the log
        #[arg(long)]
        quiet: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct LogListOutput {
    pub records: Vec<LogRecord>,
    pub total: usize,
}

impl CommandOutput for LogListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "category", "message", "recorded"]);
        for record in &self.records {
            table.add_row(vec![
                record.id.to_string(),
                colorize_category(record.category).to_string(),
                truncate(&record.message, 80),
                record.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]);
        }
        render_list("log entry", &table, self.total)
    }
}

#[derive(Debug, Serialize)]
pub struct LogRecordOutput {
    #[serde(flatten)]
    pub record: LogRecord,
    #[serde(skip)]
    pub deleted: bool,
}

impl CommandOutput for LogRecordOutput {
    fn to_human(&self) -> String {
        if self.deleted {
            return format!("Log entry {} deleted", self.record.id);
        }
        format!(
            "[{}] {} {}",
            self.record.recorded_at.to_rfc3339(),
            colorize_category(self.record.category),
            self.record.message
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ClearOutput {
    pub success: bool,
    pub deleted: u64,
}

impl CommandOutput for ClearOutput {
    fn to_human(&self) -> String {
        format!("Deleted {} log entries", self.deleted)
    }
}

fn parse_category(s: &str) -> Result<LogCategory> {
    LogCategory::parse_str(s).ok_or_else(|| {
        let known: Vec<&str> = LogCategory::ALL.iter().map(LogCategory::as_str).collect();
        anyhow::anyhow!("Invalid log category: {s}. Known categories: {}", known.join(", "))
    })
}

pub async fn execute(args: LogArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    match args.command {
        LogCommands::List { category, limit } => {
            let category = category.as_deref().map(parse_category).transpose()?;
            let records = ctx.logs.list_logs(category, limit).await?;
            let total = records.len();
            output(&LogListOutput { records, total }, json_mode);
        }
        LogCommands::Show { id } => {
            let record = ctx.logs.get_log(id).await?;
            output(&LogRecordOutput { record, deleted: false }, json_mode);
        }
        LogCommands::Delete { id, quiet } => {
            let record = ctx.logs.delete_log(id, !quiet).await?;
            output(&LogRecordOutput { record, deleted: true }, json_mode);
        }
        LogCommands::Clear { quiet } => {
            let deleted = ctx.logs.clear_logs(!quiet).await?;
            output(&ClearOutput { success: true, deleted }, json_mode);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category() {
        assert_eq!(parse_category("STATE_OF_DEVICES").unwrap(), LogCategory::StateOfDevices);
        assert!(parse_category("debug").is_err());
    }
}
