//! Conveyor status engine.
//!
//! Derives the conveyor-wide status from all current defects and appends a
//! history record only when that status changes.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ConveyorStatusRecord, DefectFilter, LogCategory, SeverityFlags,
};
use crate::domain::ports::{ActionLogRepository, DefectRepository, StatusHistoryRepository};
use crate::services::criticality::CriticalityClassifier;

/// Keeps the conveyor status history in step with the current defects.
///
/// One engine serialises its own recomputes; engines sharing a store rely on
/// the store rejecting a repeated status.
pub struct ConveyorStatusEngine<D, H, L>
where
    D: DefectRepository,
    H: StatusHistoryRepository,
    L: ActionLogRepository,
{
    defects: Arc<D>,
    history: Arc<H>,
    log: Arc<L>,
    /// Serialises the read-compare-append sequence of `recompute`.
    gate: Mutex<()>,
}

impl<D, H, L> ConveyorStatusEngine<D, H, L>
where
    D: DefectRepository,
    H: StatusHistoryRepository,
    L: ActionLogRepository,
{
    /// Engine over the given ports.
    pub fn new(defects: Arc<D>, history: Arc<H>, log: Arc<L>) -> Self {
        Self {
            defects,
            history,
            log,
            gate: Mutex::new(()),
        }
    }

    /// Recompute the conveyor status, appending a record only on change.
    ///
    /// When no record exists yet the first one is always written, even for a
    /// normal status. Once a record is committed the call succeeds; a failed
    /// `state_of_devices` entry is traced and dropped.
    pub async fn recompute(&self) -> DomainResult<ConveyorStatusRecord> {
        let guard = self.gate.lock().await;

        let defects = self.defects.list(&DefectFilter::default()).await?;
        let tally = CriticalityClassifier::tally(&defects);
        let status = tally.dominant();

        let latest = self.history.latest().await?;
        if let Some(record) = latest.filter(|r| r.criticality() == status) {
            debug!(record_id = record.id, %status, "conveyor status unchanged");
            return Ok(record);
        }

        let record = match self
            .history
            .append(SeverityFlags::from_criticality(status), Utc::now())
            .await
        {
            Ok(record) => record,
            // Another writer on the same store got there first with this status.
            Err(DomainError::ConstraintViolation(reason)) => {
                debug!(%reason, "status append rejected, reading latest record");
                return self
                    .history
                    .latest()
                    .await?
                    .ok_or(DomainError::ConstraintViolation(reason));
            }
            Err(e) => return Err(e),
        };
        drop(guard);

        info!(
            record_id = record.id,
            %status,
            normal = tally.normal,
            extreme = tally.extreme,
            critical = tally.critical,
            "conveyor status changed"
        );
        let message = format!("Set current general status of conveyor: \"{status}\"");
        if let Err(error) = self.log.append(LogCategory::StateOfDevices, &message).await {
            warn!(record_id = record.id, %error, "conveyor status change not logged");
        }

        Ok(record)
    }

    /// The latest record, computing the first one if the history is empty.
    pub async fn current_status(&self) -> DomainResult<ConveyorStatusRecord> {
        match self.history.latest().await? {
            Some(record) => Ok(record),
            None => self.recompute().await,
        }
    }

    /// History newest first.
    pub async fn history(&self, limit: Option<u32>) -> DomainResult<Vec<ConveyorStatusRecord>> {
        self.history.list(limit).await
    }
}
