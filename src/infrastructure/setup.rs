//! Project setup and initialization
//!
//! Handles project initialization:
//! - Configuration directory creation
//! - Default config file creation
//! - Database creation and migrations

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::adapters::sqlite::{database_url, initialize_database};
use crate::domain::models::Config;
use crate::infrastructure::config::CONFIG_DIR;

/// Default configuration template content
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# beltmon configuration
# Override settings by editing this file, adding .beltmon/local.yaml, or
# setting environment variables with the BELTMON_ prefix.
#
# Example environment variables:
#   export BELTMON_DATABASE__PATH=/var/lib/beltmon/beltmon.db
#   export BELTMON_LOGGING__LEVEL=debug

database:
  # Path to SQLite database file (relative to the project directory)
  path: ".beltmon/beltmon.db"

  # Maximum number of database connections in pool
  max_connections: 5

logging:
  # Log level: trace, debug, info, warn, error
  level: "info"

  # Log format: json, pretty
  format: "pretty"

  # Rolling log files are written here when set
  # log_dir: ".beltmon/logs"

  # File rotation: daily, hourly, never
  rotation: "daily"

# Retry policy for transient store failures while processing detections
retry:
  max_retries: 3
  initial_backoff_ms: 500
  max_backoff_ms: 10000

# Detection listener
listener:
  # Capacity of the detection queue
  channel_capacity: 100
"#;

/// Setup paths and directories
#[derive(Debug, Clone)]
pub struct SetupPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub database_file: PathBuf,
}

impl SetupPaths {
    /// Setup paths under `root`, with the database location taken from config.
    pub fn new(root: &Path, config: &Config) -> Self {
        let config_dir = root.join(CONFIG_DIR);
        let database_path = Path::new(&config.database.path);
        let database_file = if database_path.is_absolute() {
            database_path.to_path_buf()
        } else {
            root.join(database_path)
        };

        Self {
            config_file: config_dir.join("config.yaml"),
            config_dir,
            database_file,
        }
    }

    /// Check if the project is already initialized
    pub fn is_initialized(&self) -> bool {
        self.config_file.exists() && self.database_file.exists()
    }
}

/// Create the configuration directory
pub fn create_config_dir(paths: &SetupPaths) -> Result<bool> {
    if paths.config_dir.exists() {
        return Ok(false);
    }

    fs::create_dir_all(&paths.config_dir).context("Failed to create config directory")?;
    Ok(true)
}

/// Create the default configuration file
pub fn create_config_file(paths: &SetupPaths, force: bool) -> Result<bool> {
    if paths.config_file.exists() && !force {
        return Ok(false);
    }

    fs::write(&paths.config_file, DEFAULT_CONFIG_TEMPLATE).context("Failed to write config file")?;
    Ok(true)
}

/// Create the database if needed and apply pending migrations
pub async fn run_migrations(paths: &SetupPaths) -> Result<()> {
    let url = database_url(&paths.database_file.to_string_lossy());
    let pool = initialize_database(&url, None)
        .await
        .context("Failed to initialize database")?;
    pool.close().await;
    Ok(())
}
