use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use log::{info, warn};
use shared::{ImageDetections, Phase, ReconciliationReport};
use uuid::Uuid;

use super::reconcile::DamageReconciler;
use super::session::InspectionSession;
use crate::error::{InspectionError, Result};

type SharedSession = Arc<Mutex<InspectionSession>>;

/// Outcome of recording one image into a session.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub session_id: Uuid,
    pub phase: Phase,
    pub detections_count: usize,
    pub detections: ImageDetections,
}

/// In-memory inspection sessions keyed by id.
///
/// The map lock is only held long enough to find, insert or remove an
/// entry. Each session carries its own mutex, so work on one session never
/// waits for another while calls against the same session run one at a
/// time.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
}

fn lock(session: &SharedSession) -> MutexGuard<'_, InspectionSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Uuid {
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(InspectionSession::new(id)));
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, session);
        info!("Inspection session {} started in pickup phase", id);
        id
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.with_session(id, |_| ()).is_ok()
    }

    pub fn phase(&self, id: &Uuid) -> Result<Phase> {
        self.with_session(id, |session| session.phase())
    }

    pub fn record_detection(&self, id: &Uuid, detections: ImageDetections) -> Result<RecordOutcome> {
        self.with_session(id, |session| {
            let detections_count = session.record(detections.clone());
            RecordOutcome {
                session_id: session.id,
                phase: session.phase(),
                detections_count,
                detections,
            }
        })
    }

    pub fn switch_to_return(&self, id: &Uuid) -> Result<Phase> {
        self.with_session(id, |session| {
            if session.switch_to_return() {
                info!("Inspection session {} switched to return phase", session.id);
            }
            session.phase()
        })
    }

    /// Reconciles the session and removes it. Once the session is marked
    /// closed under its own lock no other call can see it, so the report
    /// and the removal are observed together.
    pub fn complete(&self, id: &Uuid, reconciler: &DamageReconciler) -> Result<ReconciliationReport> {
        let report = self.with_session(id, |session| {
            let report = reconciler.reconcile(session);
            session.close();
            report
        })?;
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        info!(
            "Inspection session {} completed with {} new damages",
            id, report.new_damages_detected.total_new_damages
        );
        Ok(report)
    }

    /// Drops sessions untouched for longer than `max_idle` and returns how
    /// many were removed.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|id, shared| {
            let mut session = lock(shared);
            let idle = (now - session.last_activity).to_std().unwrap_or_default();
            if session.is_closed() {
                return false;
            }
            if idle > max_idle {
                warn!("Evicting inspection session {} after {:?} idle", id, idle);
                session.close();
                return false;
            }
            true
        });
        before - sessions.len()
    }

    fn get(&self, id: &Uuid) -> Result<SharedSession> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| InspectionError::not_found(id))
    }

    fn with_session<T>(&self, id: &Uuid, f: impl FnOnce(&mut InspectionSession) -> T) -> Result<T> {
        let shared = self.get(id)?;
        let mut session = lock(&shared);
        if session.is_closed() {
            return Err(InspectionError::not_found(id));
        }
        Ok(f(&mut *session))
    }
}
