//! Beltmon - conveyor belt defect monitoring
//!
//! Beltmon stores defects reported by a belt-inspection detector, links
//! repeated observations of the same defect into variation chains, and keeps
//! an append-only history of the overall conveyor status derived from the
//! severity of every stored defect.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, errors and repository ports
//! - **Service Layer** (`services`): Classification, variation chains, status engine
//! - **Adapters** (`adapters`): `SQLite` implementations of the ports
//! - **Infrastructure Layer** (`infrastructure`): Configuration, logging, setup
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use beltmon::adapters::sqlite::create_migrated_test_pool;
//! use beltmon::cli::AppContext;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = create_migrated_test_pool().await?;
//!     let ctx = AppContext::from_pool(Default::default(), pool);
//!     let status = ctx.defects.recompute_conveyor_status().await?;
//!     println!("{}", status.criticality());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult, ErrorCategory};
pub use domain::models::{
    Config, ConveyorParameters, ConveyorStatusRecord, Criticality, Defect, DefectFilter,
    DefectGeometry, DefectId, DefectType, LogCategory, LogRecord, NewDefect, SeverityFlags,
    VariationLink,
};
pub use domain::ports::{
    ActionLogRepository, ConveyorParametersRepository, DefectRepository,
    StatusHistoryRepository, VariationRepository,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    ActionLogService, ConveyorParametersService, ConveyorStatusEngine, CriticalityClassifier,
    DefectService, DetectionListener, VariationChain,
};
