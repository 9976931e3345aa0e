//! Command-line interface.

pub mod commands;
pub mod context;
pub mod display;
pub mod output;
pub mod types;

pub use context::AppContext;
pub use types::{Cli, Commands};

use std::path::Path;

use anyhow::Result;
use console::style;

use crate::domain::errors::DomainError;
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

/// Load configuration from an explicit file or the project directory.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Process exit code for a failed command.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    use crate::domain::errors::ErrorCategory;

    match err.downcast_ref::<DomainError>().map(DomainError::category) {
        Some(ErrorCategory::NotFound) => 2,
        Some(ErrorCategory::Forbidden | ErrorCategory::NotRelated) => 3,
        Some(ErrorCategory::Invalid | ErrorCategory::Conflict) => 4,
        Some(ErrorCategory::Transient) => 75,
        Some(ErrorCategory::Internal) | None => 1,
    }
}

/// Print the error and exit.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let category = err
        .downcast_ref::<DomainError>()
        .map(|e| e.category().as_str());

    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
            "category": category,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", style("error:").red().bold());
    }

    std::process::exit(exit_code(&err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_by_category() {
        assert_eq!(exit_code(&DomainError::DefectNotFound(1).into()), 2);
        assert_eq!(exit_code(&DomainError::InvalidOperation("self".into()).into()), 3);
        assert_eq!(exit_code(&DomainError::DatabaseError("locked".into()).into()), 75);
        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
    }
}
