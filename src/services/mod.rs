//! Core services of the belt monitoring system.

pub mod action_log;
pub mod conveyor_parameters;
pub mod conveyor_status;
pub mod criticality;
pub mod defect_service;
pub mod detection_listener;
pub mod retry;
pub mod variation_chain;

pub use action_log::ActionLogService;
pub use conveyor_parameters::ConveyorParametersService;
pub use conveyor_status::ConveyorStatusEngine;
pub use criticality::CriticalityClassifier;
pub use defect_service::{DefectService, DetectionReport};
pub use detection_listener::{
    DetectionEvent, DetectionListener, ListenerEvent, ListenerHandle, ListenerStatus, StopReason,
};
pub use retry::RetryPolicy;
pub use variation_chain::VariationChain;
