//! Defect domain model.
//!
//! A defect is one detected anomaly instance on the belt. Its severity is a pair
//! of mutually exclusive flags; [`SeverityFlags`] can only be built in a
//! normalised form, so a defect can never carry both flags at once.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a defect row.
pub type DefectId = i64;

/// Identifier of a photo row.
pub type PhotoId = i64;

/// Severity class of a single defect, or of the whole conveyor.
///
/// Variants are ordered by severity, so "critical dominates extreme dominates
/// normal" is simply the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    /// No severity flag set
    Normal,
    /// Needs attention soon
    Extreme,
    /// Stop-the-belt severity
    Critical,
}

impl Default for Criticality {
    fn default() -> Self {
        Self::Normal
    }
}

impl Criticality {
    /// Every class, least severe first.
    pub const ALL: [Self; 3] = [Self::Normal, Self::Extreme, Self::Critical];

    /// Lowercase name used in storage and output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Extreme => "extreme",
            Self::Critical => "critical",
        }
    }

    /// Case-insensitive inverse of [`Self::as_str`].
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "extreme" => Some(Self::Extreme),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Criticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `(is_extreme, is_critical)` flag pair shared by defects and conveyor
/// status records.
///
/// Both flags are never set together: asking for both yields
/// `critical = true, extreme = false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "RawSeverityFlags", into = "RawSeverityFlags")]
pub struct SeverityFlags {
    is_extreme: bool,
    is_critical: bool,
}

#[derive(Serialize, Deserialize)]
struct RawSeverityFlags {
    is_extreme: bool,
    is_critical: bool,
}

impl From<RawSeverityFlags> for SeverityFlags {
    fn from(raw: RawSeverityFlags) -> Self {
        Self::new(raw.is_extreme, raw.is_critical)
    }
}

impl From<SeverityFlags> for RawSeverityFlags {
    fn from(flags: SeverityFlags) -> Self {
        Self {
            is_extreme: flags.is_extreme,
            is_critical: flags.is_critical,
        }
    }
}

impl SeverityFlags {
    /// Neither flag set.
    pub const NORMAL: Self = Self { is_extreme: false, is_critical: false };
    /// Only the extreme flag.
    pub const EXTREME: Self = Self { is_extreme: true, is_critical: false };
    /// Only the critical flag.
    pub const CRITICAL: Self = Self { is_extreme: false, is_critical: true };

    /// Build a normalised flag pair. Critical takes precedence over extreme.
    pub const fn new(want_extreme: bool, want_critical: bool) -> Self {
        if want_critical {
            Self::CRITICAL
        } else if want_extreme {
            Self::EXTREME
        } else {
            Self::NORMAL
        }
    }

    /// The flag pair encoding a class.
    pub const fn from_criticality(criticality: Criticality) -> Self {
        match criticality {
            Criticality::Normal => Self::NORMAL,
            Criticality::Extreme => Self::EXTREME,
            Criticality::Critical => Self::CRITICAL,
        }
    }

    /// Whether the extreme flag is set.
    pub const fn is_extreme(&self) -> bool {
        self.is_extreme
    }

    /// Whether the critical flag is set.
    pub const fn is_critical(&self) -> bool {
        self.is_critical
    }

    /// Class encoded by the flags.
    pub const fn criticality(&self) -> Criticality {
        if self.is_critical {
            Criticality::Critical
        } else if self.is_extreme {
            Criticality::Extreme
        } else {
            Criticality::Normal
        }
    }
}

/// Fixed catalog of defect kinds reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectType {
    Chip,
    Delamination,
    Rope,
    Crack,
    Liftup,
    Hole,
    Tear,
    Wear,
    Joint,
    JointWorn,
}

impl DefectType {
    /// The whole catalog in detector order.
    pub const ALL: [Self; 10] = [
        Self::Chip,
        Self::Delamination,
        Self::Rope,
        Self::Crack,
        Self::Liftup,
        Self::Hole,
        Self::Tear,
        Self::Wear,
        Self::Joint,
        Self::JointWorn,
    ];

    /// Catalog name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chip => "chip",
            Self::Delamination => "delamination",
            Self::Rope => "rope",
            Self::Crack => "crack",
            Self::Liftup => "liftup",
            Self::Hole => "hole",
            Self::Tear => "tear",
            Self::Wear => "wear",
            Self::Joint => "joint",
            Self::JointWorn => "joint_worn",
        }
    }

    /// Look up a catalog name, ignoring case.
    pub fn parse_str(s: &str) -> Option<Self> {
        let normalized = s.to_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == normalized)
    }
}

impl fmt::Display for DefectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounding box and belt position of a defect, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DefectGeometry {
    /// Width of the bounding box across the belt
    pub box_width_mm: u32,
    /// Length of the bounding box along the belt
    pub box_length_mm: u32,
    /// Distance along the belt from the reference joint
    pub longitudinal_position_mm: i64,
    /// Distance across the belt from its edge
    pub transverse_position_mm: i64,
}

/// A detected anomaly on the belt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defect {
    /// Unique identifier
    pub id: DefectId,
    /// Kind of defect
    pub defect_type: DefectType,
    /// Bounding box and position
    pub geometry: DefectGeometry,
    /// Detector confidence, 0-100
    pub probability: u8,
    /// Normalised severity flags
    pub severity: SeverityFlags,
    /// Photo the defect was detected on
    pub photo_id: PhotoId,
    /// Detection time
    pub detected_at: DateTime<Utc>,
}

impl Defect {
    /// Class derived from the stored flags.
    pub const fn criticality(&self) -> Criticality {
        self.severity.criticality()
    }
}

/// Payload for inserting a new detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDefect {
    /// Kind of defect
    pub defect_type: DefectType,
    /// Bounding box and position
    pub geometry: DefectGeometry,
    /// Detector confidence, 0-100
    pub probability: u8,
    /// Initial severity flags
    #[serde(default)]
    pub severity: SeverityFlags,
    /// Existing photo the defect was found on
    pub photo_id: PhotoId,
    /// Detection time, now by default
    pub detected_at: DateTime<Utc>,
}

impl NewDefect {
    /// A normal-severity detection at full confidence, detected now.
    pub fn new(defect_type: DefectType, geometry: DefectGeometry, photo_id: PhotoId) -> Self {
        Self {
            defect_type,
            geometry,
            probability: 100,
            severity: SeverityFlags::NORMAL,
            photo_id,
            detected_at: Utc::now(),
        }
    }

    /// Set the detector confidence.
    pub fn with_probability(mut self, probability: u8) -> Self {
        self.probability = probability;
        self
    }

    /// Set the initial severity.
    pub fn with_severity(mut self, severity: SeverityFlags) -> Self {
        self.severity = severity;
        self
    }

    /// Set the detection time.
    pub fn detected_at(mut self, at: DateTime<Utc>) -> Self {
        self.detected_at = at;
        self
    }

    /// Check field ranges before insert.
    pub fn validate(&self) -> Result<(), String> {
        if self.probability > 100 {
            return Err(format!(
                "probability must be between 0 and 100, got {}",
                self.probability
            ));
        }
        Ok(())
    }
}

/// A stored photo capture. One capture may contain more than one defect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    /// Unique identifier
    pub id: PhotoId,
    /// Raw image bytes
    #[serde(skip)]
    pub image: Vec<u8>,
    /// Capture time
    pub captured_at: DateTime<Utc>,
}

/// Filter criteria for listing defects. `None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefectFilter {
    /// Only this kind
    pub defect_type: Option<DefectType>,
    /// Only this class
    pub criticality: Option<Criticality>,
    /// Inclusive lower bound on `detected_at`
    pub detected_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `detected_at`
    pub detected_to: Option<DateTime<Utc>>,
}

impl DefectFilter {
    /// Whether `defect` passes every set criterion.
    pub fn matches(&self, defect: &Defect) -> bool {
        self.defect_type.map_or(true, |t| defect.defect_type == t)
            && self.criticality.map_or(true, |c| defect.criticality() == c)
            && self.detected_from.map_or(true, |from| defect.detected_at >= from)
            && self.detected_to.map_or(true, |to| defect.detected_at <= to)
    }
}

/// Number of defects per severity class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeverityTally {
    /// Defects with no flag
    pub normal: u64,
    /// Extreme defects
    pub extreme: u64,
    /// Critical defects
    pub critical: u64,
}

impl SeverityTally {
    /// Count one more defect of the given class.
    pub fn add(&mut self, criticality: Criticality) {
        match criticality {
            Criticality::Normal => self.normal += 1,
            Criticality::Extreme => self.extreme += 1,
            Criticality::Critical => self.critical += 1,
        }
    }

    /// Number of defects counted.
    pub const fn total(&self) -> u64 {
        self.normal + self.extreme + self.critical
    }

    /// The conveyor-wide status implied by these counts.
    pub const fn dominant(&self) -> Criticality {
        if self.critical > 0 {
            Criticality::Critical
        } else if self.extreme > 0 {
            Criticality::Extreme
        } else {
            Criticality::Normal
        }
    }
}

impl FromIterator<Criticality> for SeverityTally {
    fn from_iter<I: IntoIterator<Item = Criticality>>(iter: I) -> Self {
        let mut tally = Self::default();
        for criticality in iter {
            tally.add(criticality);
        }
        tally
    }
}

/// Aggregate defect counts, as reported to dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DefectCounts {
    /// All defects
    pub total: u64,
    /// Extreme defects
    pub extreme: u64,
    /// Critical defects
    pub critical: u64,
}

impl From<SeverityTally> for DefectCounts {
    fn from(tally: SeverityTally) -> Self {
        Self {
            total: tally.total(),
            extreme: tally.extreme,
            critical: tally.critical,
        }
    }
}
