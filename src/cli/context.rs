//! Wiring of SQLite adapters into services for CLI commands.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::adapters::sqlite::{
    database_url, initialize_database, PoolConfig, SqliteActionLogRepository,
    SqliteConveyorParametersRepository, SqliteDefectRepository, SqliteStatusHistoryRepository,
    SqliteVariationRepository,
};
use crate::domain::models::Config;
use crate::services::{ActionLogService, ConveyorParametersService, DefectService};

pub type SqliteDefectService = DefectService<
    SqliteDefectRepository,
    SqliteVariationRepository,
    SqliteStatusHistoryRepository,
    SqliteActionLogRepository,
>;

pub type SqliteParametersService =
    ConveyorParametersService<SqliteConveyorParametersRepository, SqliteActionLogRepository>;

/// Services sharing one database pool.
pub struct AppContext {
    pub config: Config,
    pub pool: SqlitePool,
    pub defects: Arc<SqliteDefectService>,
    pub parameters: SqliteParametersService,
    pub logs: ActionLogService<SqliteActionLogRepository>,
}

impl AppContext {
    /// Open (and migrate) the configured database.
    pub async fn open(config: Config) -> Result<Self> {
        let url = database_url(&config.database.path);
        let pool = initialize_database(&url, Some(PoolConfig::from(&config.database)))
            .await
            .context("Failed to open database. Run 'beltmon init' first.")?;
        Ok(Self::from_pool(config, pool))
    }

    pub fn from_pool(config: Config, pool: SqlitePool) -> Self {
        let defect_repo = Arc::new(SqliteDefectRepository::new(pool.clone()));
        let variation_repo = Arc::new(SqliteVariationRepository::new(pool.clone()));
        let history_repo = Arc::new(SqliteStatusHistoryRepository::new(pool.clone()));
        let log_repo = Arc::new(SqliteActionLogRepository::new(pool.clone()));
        let params_repo = Arc::new(SqliteConveyorParametersRepository::new(pool.clone()));

        Self {
            defects: Arc::new(DefectService::new(
                defect_repo,
                variation_repo,
                history_repo,
                Arc::clone(&log_repo),
            )),
            parameters: ConveyorParametersService::new(params_repo, Arc::clone(&log_repo)),
            logs: ActionLogService::new(log_repo),
            config,
            pool,
        }
    }
}
