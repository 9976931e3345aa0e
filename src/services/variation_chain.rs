//! Variation chains: re-observations of one physical defect as a reverse
//! singly linked list (newest -> oldest).

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::error;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Defect, DefectId, VariationLink};
use crate::domain::ports::{DefectRepository, VariationRepository};

/// Link, unlink and traverse variation chains.
pub struct VariationChain<D, V>
where
    D: DefectRepository + 'static,
    V: VariationRepository + 'static,
{
    defects: Arc<D>,
    variations: Arc<V>,
}

impl<D, V> Clone for VariationChain<D, V>
where
    D: DefectRepository + 'static,
    V: VariationRepository + 'static,
{
    fn clone(&self) -> Self {
        Self {
            defects: Arc::clone(&self.defects),
            variations: Arc::clone(&self.variations),
        }
    }
}

/// Traversal state of [`VariationChain::chain_from`].
struct Cursor {
    at: DefectId,
    visited: HashSet<DefectId>,
    path: Vec<DefectId>,
}

impl<D, V> VariationChain<D, V>
where
    D: DefectRepository + 'static,
    V: VariationRepository + 'static,
{
    /// Chain operations over the given ports.
    pub fn new(defects: Arc<D>, variations: Arc<V>) -> Self {
        Self { defects, variations }
    }

    async fn require_defect(&self, id: DefectId) -> DomainResult<Defect> {
        self.defects.get(id).await?.ok_or(DomainError::DefectNotFound(id))
    }

    /// Record that `current_id` is a later observation of `previous_id`.
    pub async fn link(&self, previous_id: DefectId, current_id: DefectId) -> DomainResult<()> {
        if previous_id == current_id {
            return Err(DomainError::InvalidOperation(format!(
                "defect with id={previous_id} cannot be linked to itself"
            )));
        }

        self.require_defect(previous_id).await?;
        self.require_defect(current_id).await?;

        self.variations.create(VariationLink::new(current_id, previous_id)).await
    }

    /// Remove the link `current_id -> previous_id`.
    ///
    /// Fails with `NotRelated` when the two defects are linked the other way
    /// round, and with `VariationLinkNotFound` when they are not linked at all.
    pub async fn unlink(&self, previous_id: DefectId, current_id: DefectId) -> DomainResult<()> {
        if previous_id == current_id {
            return Err(DomainError::InvalidOperation(format!(
                "defect with id={previous_id} cannot be unlinked from itself"
            )));
        }

        let wanted = VariationLink::new(current_id, previous_id);
        if self.variations.find_by_current(current_id).await? == Some(wanted)
            && self.variations.delete(wanted).await?
        {
            return Ok(());
        }

        let reversed = VariationLink::new(previous_id, current_id);
        if self.variations.find_by_current(previous_id).await? == Some(reversed) {
            return Err(DomainError::NotRelated {
                previous: previous_id,
                current: current_id,
            });
        }

        Err(DomainError::VariationLinkNotFound {
            previous: previous_id,
            current: current_id,
        })
    }

    /// Immediate predecessor of a defect, `None` for the oldest of a chain.
    pub async fn previous_of(&self, defect_id: DefectId) -> DomainResult<Option<Defect>> {
        self.require_defect(defect_id).await?;

        match self.variations.find_by_current(defect_id).await? {
            Some(link) => self.require_defect(link.previous_id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Lazily walk backwards from `defect_id`, yielding each predecessor.
    ///
    /// The start defect itself is not yielded. A revisited defect ends the
    /// stream with `CycleDetected` carrying the walked path.
    pub fn chain_from(&self, defect_id: DefectId) -> BoxStream<'static, DomainResult<Defect>> {
        let chain = self.clone();
        let start = stream::once(async move {
            chain.require_defect(defect_id).await.map(|_| Cursor {
                at: defect_id,
                visited: HashSet::from([defect_id]),
                path: vec![defect_id],
            })
        });

        let chain = self.clone();
        start
            .map_ok(move |cursor| {
                let chain = chain.clone();
                stream::try_unfold(cursor, move |cursor| {
                    let chain = chain.clone();
                    async move { chain.step(cursor).await }
                })
            })
            .try_flatten()
            .boxed()
    }

    async fn step(&self, mut cursor: Cursor) -> DomainResult<Option<(Defect, Cursor)>> {
        let Some(link) = self.variations.find_by_current(cursor.at).await? else {
            return Ok(None);
        };

        let previous_id = link.previous_id;
        cursor.path.push(previous_id);
        if !cursor.visited.insert(previous_id) {
            error!(path = ?cursor.path, "variation chain cycle detected");
            return Err(DomainError::CycleDetected(cursor.path));
        }

        let defect = self.require_defect(previous_id).await?;
        cursor.at = previous_id;
        Ok(Some((defect, cursor)))
    }

    /// Collect the whole chain behind `defect_id`, newest first.
    pub async fn collect_chain(&self, defect_id: DefectId) -> DomainResult<Vec<Defect>> {
        self.chain_from(defect_id).try_collect().await
    }
}
