//! Conveyor parameters service.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ConveyorParameters, ConveyorParametersUpdate, LogCategory};
use crate::domain::ports::{ActionLogRepository, ConveyorParametersRepository};

/// Read and update the belt's physical parameters.
pub struct ConveyorParametersService<P, L>
where
    P: ConveyorParametersRepository,
    L: ActionLogRepository,
{
    repository: Arc<P>,
    log: Arc<L>,
}

impl<P, L> ConveyorParametersService<P, L>
where
    P: ConveyorParametersRepository,
    L: ActionLogRepository,
{
    /// Service over the given ports.
    pub fn new(repository: Arc<P>, log: Arc<L>) -> Self {
        Self { repository, log }
    }

    /// Current parameters, defaults when never set.
    pub async fn conveyor_parameters(&self) -> DomainResult<ConveyorParameters> {
        self.repository.get().await
    }

    /// Apply a partial update. Every given value must be positive.
    pub async fn update_conveyor_parameters(
        &self,
        update: ConveyorParametersUpdate,
    ) -> DomainResult<ConveyorParameters> {
        update.validate().map_err(DomainError::ValidationFailed)?;

        let current = self.repository.get().await?;
        if update.is_empty() {
            return Ok(current);
        }

        let updated = update.apply_to(current);
        self.repository.update(&updated).await?;

        info!(
            belt_length_mm = updated.belt_length_mm,
            belt_width_mm = updated.belt_width_mm,
            belt_thickness_mm = updated.belt_thickness_mm,
            "conveyor parameters updated"
        );
        if let Err(error) = self
            .log
            .append(LogCategory::StateOfDevices, "Base parameters of the conveyor were updated")
            .await
        {
            warn!(%error, "conveyor parameters change not logged");
        }

        Ok(updated)
    }
}
