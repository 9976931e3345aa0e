//! Action log port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{LogCategory, LogRecord, LogRecordId};

/// Operator-facing log of actions and state changes.
#[async_trait]
pub trait ActionLogRepository: Send + Sync {
    /// Append an entry stamped with the current time.
    async fn append(&self, category: LogCategory, message: &str) -> DomainResult<LogRecord>;

    /// Fetch one entry.
    async fn get(&self, id: LogRecordId) -> DomainResult<Option<LogRecord>>;

    /// Records newest first, optionally restricted to one category.
    async fn list(&self, category: Option<LogCategory>, limit: Option<u32>) -> DomainResult<Vec<LogRecord>>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: LogRecordId) -> DomainResult<bool>;

    /// Remove every record and return how many were removed.
    async fn clear(&self) -> DomainResult<u64>;
}
