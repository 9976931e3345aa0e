//! Variation links between re-observations of the same physical defect.
//!
//! Each link says "`current_id` is a later observation of `previous_id`". A
//! defect has at most one predecessor and at most one successor, so the links
//! form singly linked lists that point backwards in time.

use serde::{Deserialize, Serialize};

use super::defect::{DefectId, PhotoId};

/// A directed edge `current -> previous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariationLink {
    /// Later observation
    pub current_id: DefectId,
    /// Earlier observation
    pub previous_id: DefectId,
}

impl VariationLink {
    /// Link `current_id` back to `previous_id`.
    pub const fn new(current_id: DefectId, previous_id: DefectId) -> Self {
        Self { current_id, previous_id }
    }

    /// Whether both ends are the same defect.
    pub const fn is_self_link(&self) -> bool {
        self.current_id == self.previous_id
    }
}

/// Repoint the successor of a deleted defect at the deleted defect's own
/// predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relink {
    /// Successor whose link moves
    pub current_id: DefectId,
    /// The deleted defect
    pub from_previous: DefectId,
    /// The deleted defect's own predecessor
    pub to_previous: DefectId,
}

/// Every store change a defect deletion implies, computed up front so the
/// adapter can apply it in a single transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionPlan {
    /// Defect being deleted
    pub defect_id: DefectId,
    /// Links to drop before the defect row goes away.
    pub unlink: Vec<VariationLink>,
    /// Successor link to repoint, if any
    pub relink: Option<Relink>,
    /// Photo to remove when no other defect references it.
    pub photo_to_remove: Option<PhotoId>,
}

impl DeletionPlan {
    /// Build the plan for deleting `defect_id`.
    ///
    /// `predecessor` is the link where the defect is `current`, `successor` the
    /// link where it is `previous`. With both present the successor is
    /// re-attached to the predecessor's own `previous`, unless that would make
    /// it point at itself (a two-element cycle), in which case both links are
    /// dropped.
    pub fn build(
        defect_id: DefectId,
        photo_id: PhotoId,
        predecessor: Option<VariationLink>,
        successor: Option<VariationLink>,
        photo_shared: bool,
    ) -> Self {
        let mut unlink = Vec::new();
        let mut relink = None;

        match (predecessor, successor) {
            (Some(pred), Some(succ)) if pred.previous_id != succ.current_id => {
                unlink.push(pred);
                relink = Some(Relink {
                    current_id: succ.current_id,
                    from_previous: defect_id,
                    to_previous: pred.previous_id,
                });
            }
            (Some(pred), Some(succ)) => {
                unlink.push(pred);
                unlink.push(succ);
            }
            (Some(link), None) | (None, Some(link)) => unlink.push(link),
            (None, None) => {}
        }

        Self {
            defect_id,
            unlink,
            relink,
            photo_to_remove: (!photo_shared).then_some(photo_id),
        }
    }

    /// Whether applying the plan touches any variation link.
    pub fn changes_chain(&self) -> bool {
        !self.unlink.is_empty() || self.relink.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_of_chain_relinks() {
        // C(3) -> B(2) -> A(1), delete B
        let plan = DeletionPlan::build(
            2,
            10,
            Some(VariationLink::new(2, 1)),
            Some(VariationLink::new(3, 2)),
            true,
        );
        assert_eq!(plan.unlink, vec![VariationLink::new(2, 1)]);
        assert_eq!(
            plan.relink,
            Some(Relink { current_id: 3, from_previous: 2, to_previous: 1 })
        );
        assert_eq!(plan.photo_to_remove, None);
    }

    #[test]
    fn test_tail_and_head_only_unlink() {
        let head = DeletionPlan::build(3, 10, Some(VariationLink::new(3, 2)), None, false);
        assert_eq!(head.unlink, vec![VariationLink::new(3, 2)]);
        assert!(head.relink.is_none());
        assert_eq!(head.photo_to_remove, Some(10));

        let tail = DeletionPlan::build(1, 10, None, Some(VariationLink::new(2, 1)), false);
        assert_eq!(tail.unlink, vec![VariationLink::new(2, 1)]);
        assert!(tail.relink.is_none());
    }

    #[test]
    fn test_two_cycle_drops_both_links() {
        let plan = DeletionPlan::build(
            1,
            10,
            Some(VariationLink::new(1, 2)),
            Some(VariationLink::new(2, 1)),
            true,
        );
        assert_eq!(plan.unlink.len(), 2);
        assert!(plan.relink.is_none());
    }

    #[test]
    fn test_unlinked_defect_plan_is_empty() {
        let plan = DeletionPlan::build(5, 10, None, None, true);
        assert!(!plan.changes_chain());
    }
}
