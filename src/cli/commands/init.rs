//! `beltmon init`: create the project directory, config file and database.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::setup::{create_config_dir, create_config_file, run_migrations, SetupPaths};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(short, long)]
    pub force: bool,

    /// Project root (defaults to the current directory)
    #[arg(long)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub config_dir: String,
    pub config_file: String,
    pub database_file: String,
    pub created_dir: bool,
    pub wrote_config: bool,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if self.created_dir {
            lines.push(format!("Created {}", self.config_dir));
        }
        if self.wrote_config {
            lines.push(format!("Wrote {}", self.config_file));
        } else {
            lines.push(format!("Kept existing {} (use --force to overwrite)", self.config_file));
        }
        lines.push(format!("Database ready at {}", self.database_file));
        lines.join("\n")
    }
}

pub async fn execute(args: InitArgs, config: &Config, json_mode: bool) -> Result<()> {
    let root = match args.path {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to resolve current directory")?,
    };
    let paths = SetupPaths::new(&root, config);

    let created_dir = create_config_dir(&paths)?;
    let wrote_config = create_config_file(&paths, args.force)?;
    if let Some(parent) = paths.database_file.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    run_migrations(&paths).await?;

    output(
        &InitOutput {
            success: true,
            config_dir: paths.config_dir.display().to_string(),
            config_file: paths.config_file.display().to_string(),
            database_file: paths.database_file.display().to_string(),
            created_dir,
            wrote_config,
        },
        json_mode,
    );
    Ok(())
}
