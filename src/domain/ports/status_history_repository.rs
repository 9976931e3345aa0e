//! Conveyor status history port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{ConveyorStatusRecord, SeverityFlags};

/// Append-only store of conveyor status records.
#[async_trait]
pub trait StatusHistoryRepository: Send + Sync {
    /// The record with the greatest id, if any.
    async fn latest(&self) -> DomainResult<Option<ConveyorStatusRecord>>;

    /// Append a record. Fails with `ConstraintViolation` when it repeats the latest one.
    async fn append(
        &self,
        severity: SeverityFlags,
        recorded_at: DateTime<Utc>,
    ) -> DomainResult<ConveyorStatusRecord>;

    /// Records newest first, optionally capped at `limit`.
    async fn list(&self, limit: Option<u32>) -> DomainResult<Vec<ConveyorStatusRecord>>;
}
