//! Background listener for new-defect notifications.
//!
//! Consumes [`DetectionEvent`]s from a channel and runs
//! [`DefectService::process_detection`] for each, so status recomputes happen
//! in-process alongside request-driven ones.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Notify, RwLock};
use tracing::{debug, error, info};

use crate::domain::models::DefectId;
use crate::domain::ports::{
    ActionLogRepository, DefectRepository, StatusHistoryRepository, VariationRepository,
};
use crate::services::defect_service::{DefectService, DetectionReport};
use crate::services::retry::RetryPolicy;

/// A new defect row is ready for processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionEvent {
    /// The stored defect
    pub defect_id: DefectId,
}

/// Event emitted by the listener.
#[derive(Debug, Clone)]
pub enum ListenerEvent {
    /// The loop is running
    Started,
    /// A detection was handled
    Processed { report: DetectionReport },
    /// A detection failed after retries
    Failed { defect_id: DefectId, error: String },
    /// The loop has exited
    Stopped { reason: StopReason },
}

/// Reason the listener stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Requested through [`ListenerHandle::stop`].
    Requested,
    /// Every detection sender was dropped.
    ChannelClosed,
}

/// Counters of a listener run.
#[derive(Debug, Clone, Default)]
pub struct ListenerStatus {
    /// Whether the loop is active
    pub running: bool,
    /// Detections handled
    pub processed: u64,
    /// Detections given up on
    pub failed: u64,
}

/// Handle to control a running listener.
#[derive(Clone)]
pub struct ListenerHandle {
    stop_flag: Arc<AtomicBool>,
    wake: Arc<Notify>,
    status: Arc<RwLock<ListenerStatus>>,
}

impl ListenerHandle {
    /// Request the listener to stop after the detection in flight, if any.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    /// Whether [`Self::stop`] was called.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_flag.load(Ordering::Acquire)
    }

    /// Snapshot of the counters.
    pub async fn status(&self) -> ListenerStatus {
        self.status.read().await.clone()
    }
}

/// Background consumer that runs `process_detection` for each event.
pub struct DetectionListener<D, V, H, L>
where
    D: DefectRepository + 'static,
    V: VariationRepository + 'static,
    H: StatusHistoryRepository + 'static,
    L: ActionLogRepository + 'static,
{
    service: Arc<DefectService<D, V, H, L>>,
    retry: RetryPolicy,
    event_capacity: usize,
    stop_flag: Arc<AtomicBool>,
    wake: Arc<Notify>,
    status: Arc<RwLock<ListenerStatus>>,
}

impl<D, V, H, L> DetectionListener<D, V, H, L>
where
    D: DefectRepository + 'static,
    V: VariationRepository + 'static,
    H: StatusHistoryRepository + 'static,
    L: ActionLogRepository + 'static,
{
    /// Listener over `service`, retrying transient failures with `retry`.
    pub fn new(service: Arc<DefectService<D, V, H, L>>, retry: RetryPolicy, event_capacity: usize) -> Self {
        Self {
            service,
            retry,
            event_capacity: event_capacity.max(1),
            stop_flag: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
            status: Arc::new(RwLock::new(ListenerStatus::default())),
        }
    }

    /// A handle sharing this listener's stop flag and status.
    pub fn handle(&self) -> ListenerHandle {
        ListenerHandle {
            stop_flag: Arc::clone(&self.stop_flag),
            wake: Arc::clone(&self.wake),
            status: Arc::clone(&self.status),
        }
    }

    /// Spawn the listener, returning a channel of its events.
    pub fn run(self, detections: mpsc::Receiver<DetectionEvent>) -> mpsc::Receiver<ListenerEvent> {
        let (tx, rx) = mpsc::channel(self.event_capacity);

        tokio::spawn(async move {
            self.run_loop(detections, tx).await;
        });

        rx
    }

    /// Run the listener on the current task with an existing sender.
    pub async fn run_with_sender(
        self,
        detections: mpsc::Receiver<DetectionEvent>,
        tx: mpsc::Sender<ListenerEvent>,
    ) -> StopReason {
        self.run_loop(detections, tx).await
    }

    async fn run_loop(
        self,
        mut detections: mpsc::Receiver<DetectionEvent>,
        tx: mpsc::Sender<ListenerEvent>,
    ) -> StopReason {
        self.status.write().await.running = true;
        info!("detection listener started");
        let _ = tx.send(ListenerEvent::Started).await;

        let reason = loop {
            if self.stop_flag.load(Ordering::Acquire) {
                break StopReason::Requested;
            }

            tokio::select! {
                () = self.wake.notified() => {
                    if self.stop_flag.load(Ordering::Acquire) {
                        break StopReason::Requested;
                    }
                }
                received = detections.recv() => match received {
                    Some(event) => self.handle_detection(event, &tx).await,
                    None => break StopReason::ChannelClosed,
                },
            }
        };

        self.status.write().await.running = false;
        info!(?reason, "detection listener stopped");
        let _ = tx.send(ListenerEvent::Stopped { reason }).await;
        reason
    }

    async fn handle_detection(&self, event: DetectionEvent, tx: &mpsc::Sender<ListenerEvent>) {
        let defect_id = event.defect_id;
        debug!(defect_id, "processing detection");

        let service = &self.service;
        let result = self
            .retry
            .execute(|| async move { service.process_detection(defect_id).await })
            .await;

        match result {
            Ok(report) => {
                self.status.write().await.processed += 1;
                info!(
                    defect_id,
                    criticality = %report.criticality,
                    status = %report.status.criticality(),
                    "detection processed"
                );
                let _ = tx.send(ListenerEvent::Processed { report }).await;
            }
            Err(err) => {
                self.status.write().await.failed += 1;
                error!(defect_id, error = %err, "detection processing failed");
                let _ = tx
                    .send(ListenerEvent::Failed {
                        defect_id,
                        error: err.to_string(),
                    })
                    .await;
            }
        }
    }
}
