//! Table and color helpers for human-readable output.
//!
//! Coloring goes through `console`, which honours `NO_COLOR` and non-tty stdout.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use console::{style, StyledObject};

use crate::domain::models::{Criticality, LogCategory};

/// Create a standard list table with the given headers.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

/// Render the table with a count line, or a placeholder when empty.
pub fn render_list(entity_name: &str, table: &Table, total: usize) -> String {
    if total == 0 {
        return format!("No {entity_name}s found.");
    }
    let noun = if total == 1 {
        entity_name.to_string()
    } else {
        format!("{entity_name}s")
    };
    format!("{} {noun}:\n{table}", style(total).bold())
}

pub fn colorize_criticality(criticality: Criticality) -> StyledObject<&'static str> {
    let text = criticality.as_str();
    match criticality {
        Criticality::Normal => style(text).green(),
        Criticality::Extreme => style(text).yellow().bold(),
        Criticality::Critical => style(text).red().bold(),
    }
}

pub fn colorize_category(category: LogCategory) -> StyledObject<&'static str> {
    let text = category.as_str();
    match category {
        LogCategory::Info | LogCategory::ActionInfo => style(text).blue(),
        LogCategory::StateOfDevices => style(text).cyan(),
        LogCategory::Warning | LogCategory::ExtremeDefect => style(text).yellow(),
        LogCategory::Error | LogCategory::CriticalDefect => style(text).red().bold(),
    }
}
