//! Conveyor parameters port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::ConveyorParameters;

/// Storage of the single conveyor parameters row.
#[async_trait]
pub trait ConveyorParametersRepository: Send + Sync {
    /// Current parameters; defaults when none were ever stored.
    async fn get(&self) -> DomainResult<ConveyorParameters>;

    /// Insert or replace the parameters row.
    async fn update(&self, params: &ConveyorParameters) -> DomainResult<()>;
}
