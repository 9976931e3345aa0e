//! Defect criticality classification.
//!
//! Pure functions over [`SeverityFlags`]; nothing here touches a store.

use crate::domain::models::{Criticality, Defect, SeverityFlags, SeverityTally};

/// Maps defect flags to a [`Criticality`] and plans flag updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct CriticalityClassifier;

impl CriticalityClassifier {
    /// Classify a single defect.
    pub const fn classify(defect: &Defect) -> Criticality {
        defect.severity.criticality()
    }

    /// Normalise a requested flag pair. Critical wins when both are asked for.
    pub const fn normalize(want_extreme: bool, want_critical: bool) -> SeverityFlags {
        SeverityFlags::new(want_extreme, want_critical)
    }

    /// The flags to persist for a criticality change, or `None` when the
    /// normalised request equals what the defect already carries.
    pub fn plan_update(defect: &Defect, want_extreme: bool, want_critical: bool) -> Option<SeverityFlags> {
        let requested = Self::normalize(want_extreme, want_critical);
        (requested != defect.severity).then_some(requested)
    }

    /// Count defects per class.
    pub fn tally<'a>(defects: impl IntoIterator<Item = &'a Defect>) -> SeverityTally {
        defects.into_iter().map(Self::classify).collect()
    }

    /// Conveyor-wide status: critical dominates extreme dominates normal.
    pub fn conveyor_status<'a>(defects: impl IntoIterator<Item = &'a Defect>) -> Criticality {
        Self::tally(defects).dominant()
    }
}
