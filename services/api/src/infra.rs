use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use admitdesk::admissions::{MemoryStore, SessionManager};
use admitdesk::config::SessionConfig;
use metrics_exporter_prometheus::PrometheusHandle;

/// Shared handler state: the store, the session table, and the operational
/// bits (readiness flag, metrics handle).
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) sessions: Arc<SessionManager>,
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

impl AppState {
    pub(crate) fn new(session: &SessionConfig, metrics: Arc<PrometheusHandle>) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            sessions: Arc::new(SessionManager::new(session.persistent_ttl())),
            readiness: Arc::new(AtomicBool::new(false)),
            metrics,
        }
    }
}
