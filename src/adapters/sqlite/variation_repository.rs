//! SQLite implementation of the VariationRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::DomainResult;
use crate::domain::models::{DefectId, VariationLink};
use crate::domain::ports::VariationRepository;

/// Variation links table.
#[derive(Clone)]
pub struct SqliteVariationRepository {
    pool: SqlitePool,
}

impl SqliteVariationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VariationRepository for SqliteVariationRepository {
    async fn create(&self, link: VariationLink) -> DomainResult<()> {
        sqlx::query("INSERT INTO defect_variations (current_id, previous_id) VALUES (?, ?)")
            .bind(link.current_id)
            .bind(link.previous_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, link: VariationLink) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM defect_variations WHERE current_id = ? AND previous_id = ?")
            .bind(link.current_id)
            .bind(link.previous_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_current(&self, current_id: DefectId) -> DomainResult<Option<VariationLink>> {
        let row: Option<LinkRow> = sqlx::query_as(
            "SELECT current_id, previous_id FROM defect_variations WHERE current_id = ?",
        )
        .bind(current_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_by_previous(&self, previous_id: DefectId) -> DomainResult<Option<VariationLink>> {
        let row: Option<LinkRow> = sqlx::query_as(
            "SELECT current_id, previous_id FROM defect_variations WHERE previous_id = ?",
        )
        .bind(previous_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

#[derive(sqlx::FromRow)]
struct LinkRow {
    current_id: i64,
    previous_id: i64,
}

impl From<LinkRow> for VariationLink {
    fn from(row: LinkRow) -> Self {
        VariationLink::new(row.current_id, row.previous_id)
    }
}
