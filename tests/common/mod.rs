//! Common test utilities for integration tests
//!
//! Provides an in-memory store implementing every repository port, plus
//! fixtures for building services over it or over a migrated `SQLite` pool.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use beltmon::adapters::sqlite::create_migrated_test_pool;
use beltmon::cli::AppContext;
use beltmon::domain::errors::{DomainError, DomainResult};
use beltmon::domain::models::{
    Config, ConveyorParameters, ConveyorStatusRecord, Defect, DefectFilter, DefectGeometry,
    DefectId, DefectType, DeletionPlan, LogCategory, LogRecord, LogRecordId, NewDefect, Photo,
    PhotoId, SeverityFlags, VariationLink,
};
use beltmon::domain::ports::{
    ActionLogRepository, ConveyorParametersRepository, DefectRepository,
    StatusHistoryRepository, VariationRepository,
};
use beltmon::services::DefectService;
use chrono::{DateTime, Utc};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// ========================
// In-memory store
// ========================

#[derive(Default)]
struct State {
    next_id: i64,
    photos: HashMap<PhotoId, Photo>,
    defects: BTreeMap<DefectId, Defect>,
    links: Vec<VariationLink>,
    history: Vec<ConveyorStatusRecord>,
    logs: Vec<LogRecord>,
    params: Option<ConveyorParameters>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Store mirroring the `SQLite` schema guarantees: unique link endpoints,
/// no self links, no repeated status.
#[derive(Default)]
pub struct FakeStore {
    state: StdMutex<State>,
    failing_defect_reads: AtomicU32,
    defect_reads: AtomicU32,
    failing_log_appends: AtomicU32,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next `n` defect lookups fail with a transient error.
    pub fn fail_next_defect_reads(&self, n: u32) {
        self.failing_defect_reads.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` action-log appends fail with a transient error.
    pub fn fail_next_log_appends(&self, n: u32) {
        self.failing_log_appends.store(n, Ordering::SeqCst);
    }

    pub fn defect_reads(&self) -> u32 {
        self.defect_reads.load(Ordering::SeqCst)
    }

    /// Insert a raw link, bypassing service checks. Used to build cycles.
    pub fn force_link(&self, link: VariationLink) {
        self.state.lock().unwrap().links.push(link);
    }

    pub fn history_len(&self) -> usize {
        self.state.lock().unwrap().history.len()
    }

    pub fn logs(&self) -> Vec<LogRecord> {
        self.state.lock().unwrap().logs.clone()
    }

    pub fn photo_exists(&self, id: PhotoId) -> bool {
        self.state.lock().unwrap().photos.contains_key(&id)
    }
}

#[async_trait]
impl DefectRepository for FakeStore {
    async fn create_photo(&self, image: &[u8], captured_at: DateTime<Utc>) -> DomainResult<PhotoId> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.photos.insert(id, Photo { id, image: image.to_vec(), captured_at });
        Ok(id)
    }

    async fn get_photo(&self, id: PhotoId) -> DomainResult<Option<Photo>> {
        Ok(self.state.lock().unwrap().photos.get(&id).cloned())
    }

    async fn create(&self, defect: &NewDefect) -> DomainResult<Defect> {
        let mut state = self.state.lock().unwrap();
        if !state.photos.contains_key(&defect.photo_id) {
            return Err(DomainError::ConstraintViolation("FOREIGN KEY constraint failed".into()));
        }
        let id = state.next_id();
        let created = Defect {
            id,
            defect_type: defect.defect_type,
            geometry: defect.geometry,
            probability: defect.probability,
            severity: defect.severity,
            photo_id: defect.photo_id,
            detected_at: defect.detected_at,
        };
        state.defects.insert(id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: DefectId) -> DomainResult<Option<Defect>> {
        self.defect_reads.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_defect_reads.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_defect_reads.store(failing - 1, Ordering::SeqCst);
            return Err(DomainError::DatabaseError("database is locked".into()));
        }
        Ok(self.state.lock().unwrap().defects.get(&id).cloned())
    }

    async fn list(&self, filter: &DefectFilter) -> DomainResult<Vec<Defect>> {
        let state = self.state.lock().unwrap();
        Ok(state.defects.values().filter(|d| filter.matches(d)).cloned().collect())
    }

    async fn update_severity(&self, id: DefectId, severity: SeverityFlags) -> DomainResult<()> {
        let mut state = self.state.lock().unwrap();
        let defect = state.defects.get_mut(&id).ok_or(DomainError::DefectNotFound(id))?;
        defect.severity = severity;
        Ok(())
    }

    async fn delete_with_chain_repair(&self, id: DefectId) -> DomainResult<DeletionPlan> {
        let mut state = self.state.lock().unwrap();
        let defect = state.defects.get(&id).cloned().ok_or(DomainError::DefectNotFound(id))?;
        let predecessor = state.links.iter().find(|l| l.current_id == id).copied();
        let successor = state.links.iter().find(|l| l.previous_id == id).copied();
        let references = state.defects.values().filter(|d| d.photo_id == defect.photo_id).count();
        let plan = DeletionPlan::build(id, defect.photo_id, predecessor, successor, references > 1);

        state.links.retain(|l| !plan.unlink.contains(l));
        if let Some(relink) = plan.relink {
            for link in &mut state.links {
                if link.current_id == relink.current_id && link.previous_id == relink.from_previous {
                    link.previous_id = relink.to_previous;
                }
            }
        }
        state.defects.remove(&id);
        if let Some(photo_id) = plan.photo_to_remove {
            state.photos.remove(&photo_id);
        }
        Ok(plan)
    }
}

#[async_trait]
impl VariationRepository for FakeStore {
    async fn create(&self, link: VariationLink) -> DomainResult<()> {
        let mut state = self.state.lock().unwrap();
        if link.is_self_link() {
            return Err(DomainError::ConstraintViolation("CHECK constraint failed".into()));
        }
        if state
            .links
            .iter()
            .any(|l| l.current_id == link.current_id || l.previous_id == link.previous_id)
        {
            return Err(DomainError::ConstraintViolation("UNIQUE constraint failed".into()));
        }
        state.links.push(link);
        Ok(())
    }

    async fn delete(&self, link: VariationLink) -> DomainResult<bool> {
        let mut state = self.state.lock().unwrap();
        let before = state.links.len();
        state.links.retain(|l| *l != link);
        Ok(state.links.len() < before)
    }

    async fn find_by_current(&self, current_id: DefectId) -> DomainResult<Option<VariationLink>> {
        let state = self.state.lock().unwrap();
        Ok(state.links.iter().find(|l| l.current_id == current_id).copied())
    }

    async fn find_by_previous(&self, previous_id: DefectId) -> DomainResult<Option<VariationLink>> {
        let state = self.state.lock().unwrap();
        Ok(state.links.iter().find(|l| l.previous_id == previous_id).copied())
    }
}

#[async_trait]
impl StatusHistoryRepository for FakeStore {
    async fn latest(&self) -> DomainResult<Option<ConveyorStatusRecord>> {
        Ok(self.state.lock().unwrap().history.last().copied())
    }

    async fn append(
        &self,
        severity: SeverityFlags,
        recorded_at: DateTime<Utc>,
    ) -> DomainResult<ConveyorStatusRecord> {
        let mut state = self.state.lock().unwrap();
        if state.history.last().is_some_and(|r| r.severity == severity) {
            return Err(DomainError::ConstraintViolation("conveyor status unchanged".into()));
        }
        let id = state.next_id();
        let record = ConveyorStatusRecord { id, severity, recorded_at };
        state.history.push(record);
        Ok(record)
    }

    async fn list(&self, limit: Option<u32>) -> DomainResult<Vec<ConveyorStatusRecord>> {
        let state = self.state.lock().unwrap();
        let take = limit.map_or(usize::MAX, |l| l as usize);
        Ok(state.history.iter().rev().take(take).copied().collect())
    }
}

#[async_trait]
impl ActionLogRepository for FakeStore {
    async fn append(&self, category: LogCategory, message: &str) -> DomainResult<LogRecord> {
        let failing = self.failing_log_appends.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_log_appends.store(failing - 1, Ordering::SeqCst);
            return Err(DomainError::DatabaseError("database is locked".into()));
        }
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let record = LogRecord {
            id,
            category,
            message: message.to_string(),
            recorded_at: Utc::now(),
        };
        state.logs.push(record.clone());
        Ok(record)
    }

    async fn get(&self, id: LogRecordId) -> DomainResult<Option<LogRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.logs.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self, category: Option<LogCategory>, limit: Option<u32>) -> DomainResult<Vec<LogRecord>> {
        let state = self.state.lock().unwrap();
        let take = limit.map_or(usize::MAX, |l| l as usize);
        Ok(state
            .logs
            .iter()
            .rev()
            .filter(|r| category.map_or(true, |c| r.category == c))
            .take(take)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: LogRecordId) -> DomainResult<bool> {
        let mut state = self.state.lock().unwrap();
        let before = state.logs.len();
        state.logs.retain(|r| r.id != id);
        Ok(state.logs.len() < before)
    }

    async fn clear(&self) -> DomainResult<u64> {
        let mut state = self.state.lock().unwrap();
        let removed = state.logs.len() as u64;
        state.logs.clear();
        Ok(removed)
    }
}

#[async_trait]
impl ConveyorParametersRepository for FakeStore {
    async fn get(&self) -> DomainResult<ConveyorParameters> {
        Ok(self.state.lock().unwrap().params.unwrap_or_default())
    }

    async fn update(&self, params: &ConveyorParameters) -> DomainResult<()> {
        self.state.lock().unwrap().params = Some(*params);
        Ok(())
    }
}

// ========================
// Fixtures
// ========================

pub type FakeDefectService = DefectService<FakeStore, FakeStore, FakeStore, FakeStore>;

pub fn fake_service(store: &Arc<FakeStore>) -> Arc<FakeDefectService> {
    Arc::new(DefectService::new(
        Arc::clone(store),
        Arc::clone(store),
        Arc::clone(store),
        Arc::clone(store),
    ))
}

/// Services over a fresh in-memory `SQLite` database.
pub async fn sqlite_context() -> AppContext {
    let pool = create_migrated_test_pool()
        .await
        .expect("failed to create migrated pool");
    AppContext::from_pool(Config::default(), pool)
}

pub fn detection(photo_id: PhotoId, severity: SeverityFlags) -> NewDefect {
    NewDefect::new(
        DefectType::Tear,
        DefectGeometry {
            box_width_mm: 40,
            box_length_mm: 120,
            longitudinal_position_mm: 5_000,
            transverse_position_mm: 300,
        },
        photo_id,
    )
    .with_probability(90)
    .with_severity(severity)
}

/// Store a photo and `count` defects on it with the given severity.
pub async fn seed_defects<D, V, H, L>(
    service: &DefectService<D, V, H, L>,
    severity: SeverityFlags,
    count: usize,
) -> Vec<Defect>
where
    D: DefectRepository + 'static,
    V: VariationRepository + 'static,
    H: StatusHistoryRepository + 'static,
    L: ActionLogRepository + 'static,
{
    let photo = service
        .store_photo(b"jpeg".to_vec())
        .await
        .expect("failed to store photo");
    let mut defects = Vec::with_capacity(count);
    for _ in 0..count {
        defects.push(
            service
                .record_detection(detection(photo.id, severity))
                .await
                .expect("failed to record detection"),
        );
    }
    defects
}
