//! Port trait definitions (Hexagonal Architecture)
//!
//! Async interfaces the storage adapters implement:
//! - DefectRepository: defects and photos
//! - VariationRepository: re-observation links between defects
//! - StatusHistoryRepository: append-only conveyor status history
//! - ActionLogRepository: operator-facing action log
//! - ConveyorParametersRepository: physical belt description

pub mod action_log_repository;
pub mod conveyor_parameters_repository;
pub mod defect_repository;
pub mod status_history_repository;
pub mod variation_repository;

pub use action_log_repository::ActionLogRepository;
pub use conveyor_parameters_repository::ConveyorParametersRepository;
pub use defect_repository::DefectRepository;
pub use status_history_repository::StatusHistoryRepository;
pub use variation_repository::VariationRepository;
