//! SQLite implementation of the DefectRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{format_datetime, narrow, parse_datetime};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Criticality, Defect, DefectFilter, DefectGeometry, DefectId, DefectType, DeletionPlan,
    NewDefect, Photo, PhotoId, SeverityFlags, VariationLink,
};
use crate::domain::ports::DefectRepository;

const DEFECT_COLUMNS: &str = "id, defect_type, box_width_mm, box_length_mm, longitudinal_position_mm, \
     transverse_position_mm, probability, is_extreme, is_critical, photo_id, detected_at";

/// Defects and photos tables.
#[derive(Clone)]
pub struct SqliteDefectRepository {
    pool: SqlitePool,
}

impl SqliteDefectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DefectRepository for SqliteDefectRepository {
    async fn create_photo(&self, image: &[u8], captured_at: DateTime<Utc>) -> DomainResult<PhotoId> {
        let result = sqlx::query("INSERT INTO photos (image, captured_at) VALUES (?, ?)")
            .bind(image)
            .bind(format_datetime(&captured_at))
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get_photo(&self, id: PhotoId) -> DomainResult<Option<Photo>> {
        let row: Option<PhotoRow> =
            sqlx::query_as("SELECT id, image, captured_at FROM photos WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn create(&self, defect: &NewDefect) -> DomainResult<Defect> {
        defect.validate().map_err(DomainError::ValidationFailed)?;

        let photo_exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM photos WHERE id = ?")
            .bind(defect.photo_id)
            .fetch_optional(&self.pool)
            .await?;
        if photo_exists.is_none() {
            return Err(DomainError::PhotoNotFound(defect.photo_id));
        }

        let result = sqlx::query(
            r#"INSERT INTO defects (defect_type, box_width_mm, box_length_mm, longitudinal_position_mm,
               transverse_position_mm, probability, is_extreme, is_critical, photo_id, detected_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(defect.defect_type.as_str())
        .bind(i64::from(defect.geometry.box_width_mm))
        .bind(i64::from(defect.geometry.box_length_mm))
        .bind(defect.geometry.longitudinal_position_mm)
        .bind(defect.geometry.transverse_position_mm)
        .bind(i64::from(defect.probability))
        .bind(defect.severity.is_extreme())
        .bind(defect.severity.is_critical())
        .bind(defect.photo_id)
        .bind(format_datetime(&defect.detected_at))
        .execute(&self.pool)
        .await?;

        Ok(Defect {
            id: result.last_insert_rowid(),
            defect_type: defect.defect_type,
            geometry: defect.geometry,
            probability: defect.probability,
            severity: defect.severity,
            photo_id: defect.photo_id,
            detected_at: defect.detected_at,
        })
    }

    async fn get(&self, id: DefectId) -> DomainResult<Option<Defect>> {
        let row: Option<DefectRow> =
            sqlx::query_as(&format!("SELECT {DEFECT_COLUMNS} FROM defects WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self, filter: &DefectFilter) -> DomainResult<Vec<Defect>> {
        let mut query = format!("SELECT {DEFECT_COLUMNS} FROM defects WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(defect_type) = &filter.defect_type {
            query.push_str(" AND defect_type = ?");
            bindings.push(defect_type.as_str().to_string());
        }

        match filter.criticality {
            Some(Criticality::Normal) => query.push_str(" AND is_extreme = 0 AND is_critical = 0"),
            Some(Criticality::Extreme) => query.push_str(" AND is_extreme = 1"),
            Some(Criticality::Critical) => query.push_str(" AND is_critical = 1"),
            None => {}
        }

        if let Some(from) = &filter.detected_from {
            query.push_str(" AND detected_at >= ?");
            bindings.push(format_datetime(from));
        }

        if let Some(to) = &filter.detected_to {
            query.push_str(" AND detected_at <= ?");
            bindings.push(format_datetime(to));
        }

        query.push_str(" ORDER BY id");

        let mut q = sqlx::query_as::<_, DefectRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<DefectRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_severity(&self, id: DefectId, severity: SeverityFlags) -> DomainResult<()> {
        let result = sqlx::query("UPDATE defects SET is_extreme = ?, is_critical = ? WHERE id = ?")
            .bind(severity.is_extreme())
            .bind(severity.is_critical())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::DefectNotFound(id));
        }

        Ok(())
    }

    async fn delete_with_chain_repair(&self, id: DefectId) -> DomainResult<DeletionPlan> {
        let mut tx = self.pool.begin().await?;

        // Take the write lock first so the links read below cannot change
        // before the delete commits.
        let touched = sqlx::query("UPDATE defects SET is_critical = is_critical WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(DomainError::DefectNotFound(id));
        }

        let (photo_id,): (i64,) = sqlx::query_as("SELECT photo_id FROM defects WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        let predecessor: Option<(i64, i64)> = sqlx::query_as(
            "SELECT current_id, previous_id FROM defect_variations WHERE current_id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let successor: Option<(i64, i64)> = sqlx::query_as(
            "SELECT current_id, previous_id FROM defect_variations WHERE previous_id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let (references,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM defects WHERE photo_id = ?")
            .bind(photo_id)
            .fetch_one(&mut *tx)
            .await?;

        let plan = DeletionPlan::build(
            id,
            photo_id,
            predecessor.map(|(current, previous)| VariationLink::new(current, previous)),
            successor.map(|(current, previous)| VariationLink::new(current, previous)),
            references > 1,
        );

        for link in &plan.unlink {
            sqlx::query("DELETE FROM defect_variations WHERE current_id = ? AND previous_id = ?")
                .bind(link.current_id)
                .bind(link.previous_id)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(relink) = &plan.relink {
            sqlx::query(
                "UPDATE defect_variations SET previous_id = ? WHERE current_id = ? AND previous_id = ?",
            )
            .bind(relink.to_previous)
            .bind(relink.current_id)
            .bind(relink.from_previous)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM defects WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if let Some(photo_id) = plan.photo_to_remove {
            sqlx::query("DELETE FROM photos WHERE id = ?")
                .bind(photo_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(plan)
    }
}

#[derive(sqlx::FromRow)]
struct DefectRow {
    id: i64,
    defect_type: String,
    box_width_mm: i64,
    box_length_mm: i64,
    longitudinal_position_mm: i64,
    transverse_position_mm: i64,
    probability: i64,
    is_extreme: bool,
    is_critical: bool,
    photo_id: i64,
    detected_at: String,
}

impl TryFrom<DefectRow> for Defect {
    type Error = DomainError;

    fn try_from(row: DefectRow) -> Result<Self, Self::Error> {
        let defect_type = DefectType::parse_str(&row.defect_type).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid defect type: {}", row.defect_type))
        })?;

        Ok(Defect {
            id: row.id,
            defect_type,
            geometry: DefectGeometry {
                box_width_mm: narrow(row.box_width_mm, "box_width_mm")?,
                box_length_mm: narrow(row.box_length_mm, "box_length_mm")?,
                longitudinal_position_mm: row.longitudinal_position_mm,
                transverse_position_mm: row.transverse_position_mm,
            },
            probability: narrow(row.probability, "probability")?,
            severity: SeverityFlags::new(row.is_extreme, row.is_critical),
            photo_id: row.photo_id,
            detected_at: parse_datetime(&row.detected_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PhotoRow {
    id: i64,
    image: Vec<u8>,
    captured_at: String,
}

impl TryFrom<PhotoRow> for Photo {
    type Error = DomainError;

    fn try_from(row: PhotoRow) -> Result<Self, Self::Error> {
        Ok(Photo {
            id: row.id,
            image: row.image,
            captured_at: parse_datetime(&row.captured_at)?,
        })
    }
}
