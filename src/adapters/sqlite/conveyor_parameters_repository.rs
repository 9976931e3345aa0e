//! SQLite implementation of the ConveyorParametersRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::DomainResult;
use crate::domain::models::ConveyorParameters;
use crate::domain::ports::ConveyorParametersRepository;

/// Single-row conveyor parameters table.
#[derive(Clone)]
pub struct SqliteConveyorParametersRepository {
    pool: SqlitePool,
}

impl SqliteConveyorParametersRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConveyorParametersRepository for SqliteConveyorParametersRepository {
    async fn get(&self) -> DomainResult<ConveyorParameters> {
        let row: Option<(i64, i64, i64)> = sqlx::query_as(
            "SELECT belt_length_mm, belt_width_mm, belt_thickness_mm FROM conveyor_parameters WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map_or_else(ConveyorParameters::default, |(length, width, thickness)| {
            ConveyorParameters {
                belt_length_mm: length,
                belt_width_mm: width,
                belt_thickness_mm: thickness,
            }
        }))
    }

    async fn update(&self, params: &ConveyorParameters) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO conveyor_parameters (id, belt_length_mm, belt_width_mm, belt_thickness_mm)
               VALUES (1, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   belt_length_mm = excluded.belt_length_mm,
                   belt_width_mm = excluded.belt_width_mm,
                   belt_thickness_mm = excluded.belt_thickness_mm"#,
        )
        .bind(params.belt_length_mm)
        .bind(params.belt_width_mm)
        .bind(params.belt_thickness_mm)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
