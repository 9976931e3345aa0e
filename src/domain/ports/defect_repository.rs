//! Defect repository port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    Defect, DefectFilter, DefectId, DeletionPlan, NewDefect, Photo, PhotoId, SeverityFlags,
};

/// Repository interface for defects and the photos they were detected on.
#[async_trait]
pub trait DefectRepository: Send + Sync {
    /// Store a photo capture and return its id.
    async fn create_photo(&self, image: &[u8], captured_at: DateTime<Utc>) -> DomainResult<PhotoId>;

    /// Fetch a photo with its image bytes.
    async fn get_photo(&self, id: PhotoId) -> DomainResult<Option<Photo>>;

    /// Insert a new defect. The referenced photo must exist.
    async fn create(&self, defect: &NewDefect) -> DomainResult<Defect>;

    /// Fetch one defect.
    async fn get(&self, id: DefectId) -> DomainResult<Option<Defect>>;

    /// List defects matching the filter, ordered by id.
    async fn list(&self, filter: &DefectFilter) -> DomainResult<Vec<Defect>>;

    /// Overwrite the severity flags of a defect.
    ///
    /// Returns `DefectNotFound` when no row was updated.
    async fn update_severity(&self, id: DefectId, severity: SeverityFlags) -> DomainResult<()>;

    /// Delete a defect in one transaction, repairing its variation chain and
    /// dropping its photo when nothing else references it.
    ///
    /// The neighbouring links are read inside that transaction. Returns the
    /// plan that was applied, or `DefectNotFound`.
    async fn delete_with_chain_repair(&self, id: DefectId) -> DomainResult<DeletionPlan>;
}
