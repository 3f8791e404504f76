use serde::Serialize;

/// Structured trace events emitted across all CrewAgent crates.
///
/// Each pipeline milestone serializes itself into the `trace_event` field
/// of a single `tracing` record, so a JSON log drain can reconstruct the
/// full decision path of any turn.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionResolved {
        session_id: String,
        is_new: bool,
    },
    SessionEvicted {
        session_id: String,
        idle_minutes: i64,
    },
    IntentClassified {
        session_id: String,
        intent: String,
        rule: String,
    },
    EntityResolved {
        session_id: String,
        status: String,
        candidates: usize,
        via_pronoun: bool,
    },
    GuardTripped {
        session_id: String,
        guard: String,
    },
    DecompositionStarted {
        session_id: String,
        subtasks: usize,
    },
    SubtaskFinished {
        session_id: String,
        task_id: String,
        deferred_rounds: usize,
    },
    RetrievalDone {
        session_id: String,
        passages: usize,
        entity_filter: Option<String>,
        duration_ms: u64,
    },
    ModelCall {
        session_id: String,
        provider: String,
        mode: String,
        duration_ms: u64,
    },
    ProposalParsed {
        session_id: String,
        proposal_id: String,
        action: String,
        retried: bool,
    },
    ProposalValidated {
        session_id: String,
        proposal_id: String,
        warnings: usize,
    },
    ProposalRejected {
        session_id: String,
        proposal_id: String,
        errors: usize,
    },
    ProposalApplied {
        proposal_id: String,
        action: String,
        entity_id: Option<String>,
    },
    TurnCompleted {
        session_id: String,
        outcome: String,
        duration_ms: u64,
    },
    TurnFailed {
        session_id: String,
        error: String,
    },
    TranscriptAppend {
        session_id: String,
        lines: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ca_event");
    }
}
