//! Conveyor-wide status history and physical parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::defect::{Criticality, SeverityFlags};

/// Identifier of a status history row.
pub type StatusRecordId = i64;

/// One entry of the append-only conveyor status history.
///
/// Consecutive entries always differ in severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConveyorStatusRecord {
    /// Unique identifier
    pub id: StatusRecordId,
    /// Conveyor severity flags
    pub severity: SeverityFlags,
    /// When the status took effect
    pub recorded_at: DateTime<Utc>,
}

impl ConveyorStatusRecord {
    /// Class encoded by the record.
    pub const fn criticality(&self) -> Criticality {
        self.severity.criticality()
    }
}

/// Physical description of the monitored belt. A single row in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConveyorParameters {
    /// Belt length in millimeters
    pub belt_length_mm: i64,
    /// Belt width in millimeters
    pub belt_width_mm: i64,
    /// Belt thickness in millimeters
    pub belt_thickness_mm: i64,
}

impl Default for ConveyorParameters {
    fn default() -> Self {
        Self {
            belt_length_mm: 17_360_000,
            belt_width_mm: 3_360,
            belt_thickness_mm: 15,
        }
    }
}

/// Partial update of [`ConveyorParameters`]; unset fields stay unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConveyorParametersUpdate {
    /// New belt length
    pub belt_length_mm: Option<i64>,
    /// New belt width
    pub belt_width_mm: Option<i64>,
    /// New belt thickness
    pub belt_thickness_mm: Option<i64>,
}

impl ConveyorParametersUpdate {
    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        self.belt_length_mm.is_none() && self.belt_width_mm.is_none() && self.belt_thickness_mm.is_none()
    }

    /// Overlay the set fields on `params`.
    pub fn apply_to(&self, params: ConveyorParameters) -> ConveyorParameters {
        ConveyorParameters {
            belt_length_mm: self.belt_length_mm.unwrap_or(params.belt_length_mm),
            belt_width_mm: self.belt_width_mm.unwrap_or(params.belt_width_mm),
            belt_thickness_mm: self.belt_thickness_mm.unwrap_or(params.belt_thickness_mm),
        }
    }

    /// Every set value must be positive.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("belt_length_mm", self.belt_length_mm),
            ("belt_width_mm", self.belt_width_mm),
            ("belt_thickness_mm", self.belt_thickness_mm),
        ] {
            if let Some(v) = value {
                if v <= 0 {
                    return Err(format!("{name} must be positive, got {v}"));
                }
            }
        }
        Ok(())
    }
}
