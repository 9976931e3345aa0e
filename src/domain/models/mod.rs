pub mod config;
pub mod conveyor_status;
pub mod defect;
pub mod log_record;
pub mod variation;

pub use config::{Config, DatabaseConfig, ListenerConfig, LoggingConfig, RetryConfig};
pub use conveyor_status::{
    ConveyorParameters, ConveyorParametersUpdate, ConveyorStatusRecord, StatusRecordId,
};
pub use defect::{
    Criticality, Defect, DefectCounts, DefectFilter, DefectGeometry, DefectId, DefectType,
    NewDefect, Photo, PhotoId, SeverityFlags, SeverityTally,
};
pub use log_record::{LogCategory, LogRecord, LogRecordId};
pub use variation::{DeletionPlan, Relink, VariationLink};
