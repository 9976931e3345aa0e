//! SQLite implementation of the ActionLogRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::{format_datetime, parse_datetime};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{LogCategory, LogRecord, LogRecordId};
use crate::domain::ports::ActionLogRepository;

/// Action log table.
#[derive(Clone)]
pub struct SqliteActionLogRepository {
    pool: SqlitePool,
}

impl SqliteActionLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActionLogRepository for SqliteActionLogRepository {
    async fn append(&self, category: LogCategory, message: &str) -> DomainResult<LogRecord> {
        let recorded_at = Utc::now();
        let result = sqlx::query("INSERT INTO action_log (category, message, recorded_at) VALUES (?, ?, ?)")
            .bind(category.as_str())
            .bind(message)
            .bind(format_datetime(&recorded_at))
            .execute(&self.pool)
            .await?;

        Ok(LogRecord {
            id: result.last_insert_rowid(),
            category,
            message: message.to_string(),
            recorded_at,
        })
    }

    async fn get(&self, id: LogRecordId) -> DomainResult<Option<LogRecord>> {
        let row: Option<LogRow> =
            sqlx::query_as("SELECT id, category, message, recorded_at FROM action_log WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self, category: Option<LogCategory>, limit: Option<u32>) -> DomainResult<Vec<LogRecord>> {
        let limit = limit.map_or(-1, i64::from);
        let rows: Vec<LogRow> = match category {
            Some(category) => {
                sqlx::query_as(
                    "SELECT id, category, message, recorded_at FROM action_log WHERE category = ? ORDER BY id DESC LIMIT ?",
                )
                .bind(category.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT id, category, message, recorded_at FROM action_log ORDER BY id DESC LIMIT ?")
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn delete(&self, id: LogRecordId) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM action_log WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> DomainResult<u64> {
        let result = sqlx::query("DELETE FROM action_log").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: i64,
    category: String,
    message: String,
    recorded_at: String,
}

impl TryFrom<LogRow> for LogRecord {
    type Error = DomainError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        let category = LogCategory::parse_str(&row.category).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid log category: {}", row.category))
        })?;

        Ok(LogRecord {
            id: row.id,
            category,
            message: row.message,
            recorded_at: parse_datetime(&row.recorded_at)?,
        })
    }
}
