//! Variation link repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{DefectId, VariationLink};

/// Repository interface for `current -> previous` variation links.
///
/// Implementations reject a second predecessor for the same `current` and a
/// second successor for the same `previous` with `ConstraintViolation`.
#[async_trait]
pub trait VariationRepository: Send + Sync {
    /// Insert a link. Fails with `ConstraintViolation` when either end is taken.
    async fn create(&self, link: VariationLink) -> DomainResult<()>;

    /// Delete a link. Returns whether a row was removed.
    async fn delete(&self, link: VariationLink) -> DomainResult<bool>;

    /// The link in which `current_id` is the later observation.
    async fn find_by_current(&self, current_id: DefectId) -> DomainResult<Option<VariationLink>>;

    /// The link in which `previous_id` is the earlier observation.
    async fn find_by_previous(&self, previous_id: DefectId) -> DomainResult<Option<VariationLink>>;
}
