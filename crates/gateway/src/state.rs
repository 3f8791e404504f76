use std::sync::Arc;

use ca_directory::EmployeeStore;
use ca_domain::config::Config;
use ca_pipeline::{Pipeline, SessionLockMap};
use ca_retrieval::RetrievalService;
use ca_sessions::{SessionStore, TranscriptWriter};

/// Shared application state passed to all API handlers.
///
/// The pipeline owns its collaborators; the store, sessions, and
/// retrieval handles are kept here as well so admin surfaces (employee
/// listing, transcript reads, background sweeps, the seed loader) can
/// reach them without going through a conversational turn.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<Pipeline>,
    pub store: Arc<dyn EmployeeStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub retrieval: Arc<dyn RetrievalService>,
    pub session_locks: Arc<SessionLockMap>,
    /// Present only when a transcript directory is configured.
    pub transcripts: Option<Arc<TranscriptWriter>>,
}
