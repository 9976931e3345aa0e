//! Action log administration.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{LogCategory, LogRecord, LogRecordId};
use crate::domain::ports::ActionLogRepository;

/// Read and prune the operator action log.
///
/// Deletions are themselves logged unless the caller opts out with
/// `log_deletion_event = false`.
pub struct ActionLogService<L: ActionLogRepository> {
    repository: Arc<L>,
}

impl<L: ActionLogRepository> ActionLogService<L> {
    /// Service over the given log store.
    pub fn new(repository: Arc<L>) -> Self {
        Self { repository }
    }

    /// Entries newest first, optionally of one category.
    pub async fn list_logs(
        &self,
        category: Option<LogCategory>,
        limit: Option<u32>,
    ) -> DomainResult<Vec<LogRecord>> {
        self.repository.list(category, limit).await
    }

    /// Fetch one entry.
    pub async fn get_log(&self, id: LogRecordId) -> DomainResult<LogRecord> {
        self.repository.get(id).await?.ok_or(DomainError::LogRecordNotFound(id))
    }

    async fn note(&self, category: LogCategory, message: String) {
        if let Err(error) = self.repository.append(category, &message).await {
            warn!(%category, %error, %message, "action log entry dropped");
        }
    }

    /// Delete one record and return it.
    ///
    /// An unknown id is logged as a warning regardless of
    /// `log_deletion_event`.
    pub async fn delete_log(&self, id: LogRecordId, log_deletion_event: bool) -> DomainResult<LogRecord> {
        let record = match self.repository.get(id).await? {
            Some(record) if self.repository.delete(id).await? => record,
            _ => {
                warn!(log_id = id, "delete of unknown log record");
                self.note(
                    LogCategory::Warning,
                    format!("Failed to remove log record with id={id}: record not found"),
                )
                .await;
                return Err(DomainError::LogRecordNotFound(id));
            }
        };

        info!(log_id = id, "log record removed");
        if log_deletion_event {
            self.note(
                LogCategory::ActionInfo,
                format!("Log record with id={id} has been removed"),
            )
            .await;
        }
        Ok(record)
    }

    /// Delete every record and return how many went. Clearing an empty log
    /// writes nothing.
    pub async fn clear_logs(&self, log_deletion_event: bool) -> DomainResult<u64> {
        let removed = self.repository.clear().await?;
        info!(removed, "action log cleared");
        if removed > 0 && log_deletion_event {
            self.note(LogCategory::ActionInfo, "All log records have been removed".to_string())
                .await;
        }
        Ok(removed)
    }
}
