//! Defect service.
//!
//! Entry point for callers of the monitoring core: criticality changes,
//! variation links, deletion and detection processing, each followed by a
//! status recompute where the change can affect it.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::BoxStream;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ConveyorStatusRecord, Criticality, Defect, DefectCounts, DefectFilter, DefectId, DefectType,
    DeletionPlan, LogCategory, NewDefect, Photo,
};
use crate::domain::ports::{
    ActionLogRepository, DefectRepository, StatusHistoryRepository, VariationRepository,
};
use crate::services::conveyor_status::ConveyorStatusEngine;
use crate::services::criticality::CriticalityClassifier;
use crate::services::variation_chain::VariationChain;

/// Outcome of processing one newly detected defect.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    /// The defect as stored.
    pub defect: Defect,
    /// Its class.
    pub criticality: Criticality,
    /// Conveyor status after the recompute.
    pub status: ConveyorStatusRecord,
}

/// Core operations over defects, variation chains and the conveyor status.
///
/// Every mutation is announced in the action log. Entries that describe a
/// change already committed to the store are best effort: a failed append is
/// traced and does not fail the operation.
pub struct DefectService<D, V, H, L>
where
    D: DefectRepository + 'static,
    V: VariationRepository + 'static,
    H: StatusHistoryRepository,
    L: ActionLogRepository,
{
    defects: Arc<D>,
    log: Arc<L>,
    chain: VariationChain<D, V>,
    engine: ConveyorStatusEngine<D, H, L>,
}

impl<D, V, H, L> DefectService<D, V, H, L>
where
    D: DefectRepository + 'static,
    V: VariationRepository + 'static,
    H: StatusHistoryRepository,
    L: ActionLogRepository,
{
    /// Build the service and its chain and status engine over shared ports.
    pub fn new(defects: Arc<D>, variations: Arc<V>, history: Arc<H>, log: Arc<L>) -> Self {
        Self {
            chain: VariationChain::new(Arc::clone(&defects), variations),
            engine: ConveyorStatusEngine::new(Arc::clone(&defects), history, Arc::clone(&log)),
            defects,
            log,
        }
    }

    /// The variation chain component.
    pub fn chain(&self) -> &VariationChain<D, V> {
        &self.chain
    }

    /// The conveyor status engine.
    pub fn engine(&self) -> &ConveyorStatusEngine<D, H, L> {
        &self.engine
    }

    async fn record(&self, category: LogCategory, message: String) -> DomainResult<()> {
        self.log.append(category, &message).await.map(|_| ())
    }

    async fn record_best_effort(&self, category: LogCategory, message: String) {
        if let Err(error) = self.log.append(category, &message).await {
            warn!(%category, %error, %message, "action log entry dropped");
        }
    }

    /// Class of a defect from its stored flags.
    pub fn classify_defect(&self, defect: &Defect) -> Criticality {
        CriticalityClassifier::classify(defect)
    }

    /// Fetch one defect.
    pub async fn get_defect(&self, id: DefectId) -> DomainResult<Defect> {
        self.defects.get(id).await?.ok_or(DomainError::DefectNotFound(id))
    }

    /// Defects matching `filter`, ordered by id.
    pub async fn list_defects(&self, filter: &DefectFilter) -> DomainResult<Vec<Defect>> {
        self.defects.list(filter).await
    }

    /// Number of defects per class.
    pub async fn count_defects(&self) -> DomainResult<DefectCounts> {
        let defects = self.defects.list(&DefectFilter::default()).await?;
        Ok(CriticalityClassifier::tally(&defects).into())
    }

    /// The defect type catalog.
    pub fn defect_types(&self) -> &'static [DefectType] {
        &DefectType::ALL
    }

    /// Store a photo capture taken now.
    pub async fn store_photo(&self, image: Vec<u8>) -> DomainResult<Photo> {
        let captured_at = Utc::now();
        let id = self.defects.create_photo(&image, captured_at).await?;
        Ok(Photo { id, image, captured_at })
    }

    /// Insert a detection. Does not classify, log or recompute; see
    /// [`Self::process_detection`].
    pub async fn record_detection(&self, defect: NewDefect) -> DomainResult<Defect> {
        defect.validate().map_err(DomainError::ValidationFailed)?;
        if self.defects.get_photo(defect.photo_id).await?.is_none() {
            return Err(DomainError::PhotoNotFound(defect.photo_id));
        }
        let created = self.defects.create(&defect).await?;
        info!(defect_id = created.id, defect_type = %created.defect_type, "defect recorded");
        Ok(created)
    }

    /// Change a defect's severity flags.
    ///
    /// Returns the defect as stored and whether anything changed. A change
    /// triggers a status recompute; an unchanged request writes nothing.
    pub async fn set_defect_criticality(
        &self,
        id: DefectId,
        want_extreme: bool,
        want_critical: bool,
    ) -> DomainResult<(Defect, bool)> {
        let Some(mut defect) = self.defects.get(id).await? else {
            warn!(defect_id = id, "criticality change for unknown defect");
            self.record_best_effort(
                LogCategory::Warning,
                format!("Failed to change criticality of defect with id={id}: defect not found"),
            )
            .await;
            return Err(DomainError::DefectNotFound(id));
        };

        let Some(severity) = CriticalityClassifier::plan_update(&defect, want_extreme, want_critical) else {
            return Ok((defect, false));
        };

        let old = defect.criticality();
        self.defects.update_severity(id, severity).await?;
        defect.severity = severity;
        let new = defect.criticality();

        self.engine.recompute().await?;

        info!(defect_id = id, %old, %new, "defect criticality changed");
        self.record_best_effort(
            LogCategory::ActionInfo,
            format!("Criticality of defect with id={id} has changed from \"{old}\" to \"{new}\""),
        )
        .await;
        Ok((defect, true))
    }

    /// Mark `current_id` as a later observation of `previous_id`.
    pub async fn link_defect_variation(&self, previous_id: DefectId, current_id: DefectId) -> DomainResult<()> {
        match self.chain.link(previous_id, current_id).await {
            Ok(()) => {
                info!(previous_id, current_id, "variation link created");
                self.record_best_effort(
                    LogCategory::Info,
                    format!("Relation between defects with id={previous_id} and id={current_id} was created"),
                )
                .await;
                Ok(())
            }
            Err(err) => {
                let message = match &err {
                    DomainError::InvalidOperation(_) => Some(format!(
                        "Failed to create relation for a defect with itself (id={previous_id})"
                    )),
                    DomainError::DefectNotFound(_) => Some(format!(
                        "Failed to create relation between defects with id={previous_id} and id={current_id}: id not found"
                    )),
                    DomainError::ConstraintViolation(_) => Some(format!(
                        "Failed to create relation between defects with id={previous_id} and id={current_id}: defect is already related"
                    )),
                    _ => None,
                };
                if let Some(message) = message {
                    warn!(previous_id, current_id, error = %err, "variation link rejected");
                    self.record_best_effort(LogCategory::Warning, message).await;
                }
                Err(err)
            }
        }
    }

    /// Remove the link between `previous_id` and `current_id`.
    pub async fn unlink_defect_variation(&self, previous_id: DefectId, current_id: DefectId) -> DomainResult<()> {
        match self.chain.unlink(previous_id, current_id).await {
            Ok(()) => {
                info!(previous_id, current_id, "variation link removed");
                self.record_best_effort(
                    LogCategory::Info,
                    format!("Relation between defects with id={previous_id} and id={current_id} was removed"),
                )
                .await;
                Ok(())
            }
            Err(err) => {
                let message = match &err {
                    DomainError::InvalidOperation(_) => Some(format!(
                        "Failed to remove relation for a defect with itself (id={previous_id})"
                    )),
                    DomainError::VariationLinkNotFound { .. } => Some(format!(
                        "Failed to remove relation between defects with id={previous_id} and id={current_id}: relation not found"
                    )),
                    DomainError::NotRelated { .. } => Some(format!(
                        "Failed to remove relation between defects with id={previous_id} and id={current_id}: defects are not related"
                    )),
                    _ => None,
                };
                if let Some(message) = message {
                    warn!(previous_id, current_id, error = %err, "variation unlink rejected");
                    self.record_best_effort(LogCategory::Warning, message).await;
                }
                Err(err)
            }
        }
    }

    /// Immediate predecessor of a defect, if any.
    pub async fn previous_variation(&self, defect_id: DefectId) -> DomainResult<Option<Defect>> {
        self.chain.previous_of(defect_id).await
    }

    /// Lazy, restartable walk over the predecessors of `defect_id`.
    pub fn variation_chain(&self, defect_id: DefectId) -> BoxStream<'static, DomainResult<Defect>> {
        self.chain.chain_from(defect_id)
    }

    /// Delete a defect, repairing its variation chain and dropping its photo
    /// when no other defect shares it. Returns the deleted record.
    pub async fn delete_defect(&self, id: DefectId) -> DomainResult<Defect> {
        let (defect, plan) = match self.remove_stored(id).await {
            Ok(deleted) => deleted,
            Err(DomainError::DefectNotFound(_)) => {
                warn!(defect_id = id, "delete of unknown defect");
                self.record_best_effort(
                    LogCategory::Warning,
                    format!("Failed to remove defect with id={id}: defect not found"),
                )
                .await;
                return Err(DomainError::DefectNotFound(id));
            }
            Err(err) => return Err(err),
        };

        self.engine.recompute().await?;

        info!(
            defect_id = id,
            unlinked = plan.unlink.len(),
            relinked = plan.relink.is_some(),
            photo_removed = plan.photo_to_remove.is_some(),
            "defect removed"
        );
        self.record_best_effort(LogCategory::ActionInfo, format!("Defect with id={id} has been removed"))
            .await;
        if plan.changes_chain() {
            self.record_best_effort(
                LogCategory::Info,
                format!("Progress chain for defect with id={id} has changed"),
            )
            .await;
        }

        Ok(defect)
    }

    async fn remove_stored(&self, id: DefectId) -> DomainResult<(Defect, DeletionPlan)> {
        let defect = self.get_defect(id).await?;
        let plan = self.defects.delete_with_chain_repair(id).await?;
        Ok((defect, plan))
    }

    /// Recompute the conveyor status, appending a record on change.
    pub async fn recompute_conveyor_status(&self) -> DomainResult<ConveyorStatusRecord> {
        self.engine.recompute().await
    }

    /// The latest conveyor status record.
    pub async fn current_conveyor_status(&self) -> DomainResult<ConveyorStatusRecord> {
        self.engine.current_status().await
    }

    /// Status history newest first.
    pub async fn status_history(&self, limit: Option<u32>) -> DomainResult<Vec<ConveyorStatusRecord>> {
        self.engine.history(limit).await
    }

    /// React to a newly detected defect: recompute the conveyor status and
    /// announce the defect in the action log.
    ///
    /// A failed announcement fails the call, so a retry announces again.
    pub async fn process_detection(&self, defect_id: DefectId) -> DomainResult<DetectionReport> {
        let Some(defect) = self.defects.get(defect_id).await? else {
            warn!(defect_id, "detection refers to unknown defect");
            self.record_best_effort(
                LogCategory::Error,
                format!("Failed to process detection: there is no defect with id={defect_id}"),
            )
            .await;
            return Err(DomainError::DefectNotFound(defect_id));
        };

        let criticality = CriticalityClassifier::classify(&defect);
        let status = self.engine.recompute().await?;

        self.record(
            LogCategory::for_detection(criticality),
            format!("New {criticality} level defect with id={defect_id} has appeared on the conveyor!"),
        )
        .await?;

        Ok(DetectionReport { defect, criticality, status })
    }
}
