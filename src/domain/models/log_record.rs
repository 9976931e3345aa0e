//! Operator-facing action log.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::defect::Criticality;

/// Identifier of an action log row.
pub type LogRecordId = i64;

/// Kind of action log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    /// Routine information
    Info,
    /// Rejected request or normal-level detection
    Warning,
    /// Failed processing
    Error,
    /// Operator-triggered change
    ActionInfo,
    /// Conveyor status or parameters change
    StateOfDevices,
    /// Extreme-level detection
    ExtremeDefect,
    /// Critical-level detection
    CriticalDefect,
}

impl LogCategory {
    /// Every category.
    pub const ALL: [Self; 7] = [
        Self::Info,
        Self::Warning,
        Self::Error,
        Self::ActionInfo,
        Self::StateOfDevices,
        Self::ExtremeDefect,
        Self::CriticalDefect,
    ];

    /// Snake-case name used in storage and output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::ActionInfo => "action_info",
            Self::StateOfDevices => "state_of_devices",
            Self::ExtremeDefect => "extreme_defect",
            Self::CriticalDefect => "critical_defect",
        }
    }

    /// Look up a category name, ignoring case.
    pub fn parse_str(s: &str) -> Option<Self> {
        let normalized = s.to_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == normalized)
    }

    /// Category used when announcing a freshly detected defect.
    pub const fn for_detection(criticality: Criticality) -> Self {
        match criticality {
            Criticality::Normal => Self::Warning,
            Criticality::Extreme => Self::ExtremeDefect,
            Criticality::Critical => Self::CriticalDefect,
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One action log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Unique identifier
    pub id: LogRecordId,
    /// Entry kind
    pub category: LogCategory,
    /// Human-readable text
    pub message: String,
    /// Write time
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_categories() {
        assert_eq!(LogCategory::for_detection(Criticality::Normal), LogCategory::Warning);
        assert_eq!(LogCategory::for_detection(Criticality::Extreme), LogCategory::ExtremeDefect);
        assert_eq!(LogCategory::for_detection(Criticality::Critical), LogCategory::CriticalDefect);
    }

    #[test]
    fn test_parse_roundtrip() {
        for category in LogCategory::ALL {
            assert_eq!(LogCategory::parse_str(category.as_str()), Some(category));
        }
    }
}
