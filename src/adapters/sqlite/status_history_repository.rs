//! SQLite implementation of the StatusHistoryRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{format_datetime, parse_datetime};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ConveyorStatusRecord, SeverityFlags};
use crate::domain::ports::StatusHistoryRepository;

/// Append-only conveyor status table.
#[derive(Clone)]
pub struct SqliteStatusHistoryRepository {
    pool: SqlitePool,
}

impl SqliteStatusHistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusHistoryRepository for SqliteStatusHistoryRepository {
    async fn latest(&self) -> DomainResult<Option<ConveyorStatusRecord>> {
        let row: Option<StatusRow> = sqlx::query_as(
            "SELECT id, is_extreme, is_critical, recorded_at FROM conveyor_status ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn append(
        &self,
        severity: SeverityFlags,
        recorded_at: DateTime<Utc>,
    ) -> DomainResult<ConveyorStatusRecord> {
        let result = sqlx::query(
            "INSERT INTO conveyor_status (is_extreme, is_critical, recorded_at) VALUES (?, ?, ?)",
        )
        .bind(severity.is_extreme())
        .bind(severity.is_critical())
        .bind(format_datetime(&recorded_at))
        .execute(&self.pool)
        .await?;

        Ok(ConveyorStatusRecord {
            id: result.last_insert_rowid(),
            severity,
            recorded_at,
        })
    }

    async fn list(&self, limit: Option<u32>) -> DomainResult<Vec<ConveyorStatusRecord>> {
        // LIMIT -1 means no limit in SQLite
        let limit = limit.map_or(-1, i64::from);
        let rows: Vec<StatusRow> = sqlx::query_as(
            "SELECT id, is_extreme, is_critical, recorded_at FROM conveyor_status ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct StatusRow {
    id: i64,
    is_extreme: bool,
    is_critical: bool,
    recorded_at: String,
}

impl TryFrom<StatusRow> for ConveyorStatusRecord {
    type Error = DomainError;

    fn try_from(row: StatusRow) -> Result<Self, Self::Error> {
        Ok(ConveyorStatusRecord {
            id: row.id,
            severity: SeverityFlags::new(row.is_extreme, row.is_critical),
            recorded_at: parse_datetime(&row.recorded_at)?,
        })
    }
}
