//! SQLite storage adapters for the belt monitoring core.

pub mod action_log_repository;
pub mod connection;
pub mod conveyor_parameters_repository;
pub mod defect_repository;
pub mod migrations;
pub mod status_history_repository;
pub mod variation_repository;

pub use action_log_repository::SqliteActionLogRepository;
pub use connection::{
    create_pool, create_test_pool, database_url, verify_connection, ConnectionError, PoolConfig,
};
pub use conveyor_parameters_repository::SqliteConveyorParametersRepository;
pub use defect_repository::SqliteDefectRepository;
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};
pub use status_history_repository::SqliteStatusHistoryRepository;
pub use variation_repository::SqliteVariationRepository;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};

/// Format a timestamp for storage.
///
/// Fixed precision and a `Z` suffix keep stored values lexicographically
/// ordered, so range filters can compare the TEXT column directly.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC3339 datetime string from a SQLite row field.
pub fn parse_datetime(s: &str) -> DomainResult<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| DomainError::SerializationError(e.to_string()))
        .map(|dt| dt.with_timezone(&Utc))
}

/// Convert a stored integer into a narrower domain type.
pub fn narrow<T: TryFrom<i64>>(value: i64, column: &str) -> DomainResult<T> {
    T::try_from(value).map_err(|_| {
        DomainError::SerializationError(format!("value {value} out of range for column {column}"))
    })
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),
    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),
}

pub async fn initialize_database(
    database_url: &str,
    config: Option<PoolConfig>,
) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(database_url, config).await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}

/// Create an in-memory test pool with all migrations applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, DatabaseError> {
    let pool = create_test_pool().await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_timestamps_sort_lexicographically() {
        let early = parse_datetime("2024-03-01T10:00:00Z").unwrap();
        let late = parse_datetime("2024-03-01T10:00:00.5Z").unwrap();
        assert!(format_datetime(&early) < format_datetime(&late));
        assert_eq!(parse_datetime(&format_datetime(&late)).unwrap(), late);
    }

    #[test]
    fn test_narrow_rejects_out_of_range() {
        assert!(narrow::<u8>(300, "probability").is_err());
        assert_eq!(narrow::<u8>(42, "probability").unwrap(), 42);
    }
}
