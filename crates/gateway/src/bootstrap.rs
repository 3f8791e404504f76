//! AppState construction and background-task spawning.
//!
//! `serve`, `repl`, `run`, and `seed` all boot the same way; this module
//! is the shared path so none of them drift. Only `serve` and `repl`
//! keep the background sweeps running.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use ca_directory::{EmployeeStore, MemoryDirectory};
use ca_domain::config::{Config, ConfigSeverity};
use ca_pipeline::{Pipeline, SessionLockMap};
use ca_providers::{LanguageModel, OllamaProvider};
use ca_retrieval::{RetrievalService, VectorIndex};
use ca_sessions::{MemorySessionStore, SessionStore, TranscriptWriter};

use crate::state::AppState;

/// Validate config, initialize every subsystem, and return a fully
/// wired [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Employee directory ───────────────────────────────────────────
    let directory = match &config.directory.persist_path {
        Some(path) => Arc::new(
            MemoryDirectory::with_persistence(path)
                .with_context(|| format!("opening employee directory at {}", path.display()))?,
        ),
        None => Arc::new(MemoryDirectory::new()),
    };
    tracing::info!(employees = directory.len(), "employee directory ready");
    let store: Arc<dyn EmployeeStore> = directory;

    // ── Language model provider ──────────────────────────────────────
    let model: Arc<dyn LanguageModel> = Arc::new(
        OllamaProvider::from_config(&config.llm).context("initializing Ollama provider")?,
    );
    tracing::info!(
        base_url = %config.llm.base_url,
        model = %config.llm.model,
        "language model provider ready"
    );

    // ── Retrieval index ──────────────────────────────────────────────
    // The index is in-memory only; `crewagent seed` fills it. A boot
    // with a persisted directory but no seed run serves record-grounded
    // answers until text is re-indexed.
    let retrieval: Arc<dyn RetrievalService> = Arc::new(VectorIndex::new(
        model.clone(),
        config.retrieval.oversample_factor,
    ));
    tracing::info!(top_k = config.retrieval.top_k, "retrieval index ready");

    // ── Session store ────────────────────────────────────────────────
    let sessions: Arc<dyn SessionStore> = match &config.sessions.persist_path {
        Some(path) => Arc::new(
            MemorySessionStore::with_persistence(config.sessions.window, path)
                .with_context(|| format!("opening session store at {}", path.display()))?,
        ),
        None => Arc::new(MemorySessionStore::new(config.sessions.window)),
    };
    tracing::info!(window = config.sessions.window, "session store ready");

    // ── Transcripts ──────────────────────────────────────────────────
    let transcripts = config
        .sessions
        .transcript_dir
        .as_ref()
        .map(|dir| Arc::new(TranscriptWriter::new(dir)));
    if let Some(dir) = &config.sessions.transcript_dir {
        tracing::info!(dir = %dir.display(), "transcript writer ready");
    }

    // ── Pipeline ─────────────────────────────────────────────────────
    let mut pipeline = Pipeline::new(
        model,
        store.clone(),
        retrieval.clone(),
        sessions.clone(),
        config.as_ref().clone(),
    );
    if let Some(writer) = &transcripts {
        pipeline = pipeline.with_transcripts(writer.clone());
    }
    let pipeline = Arc::new(pipeline);

    let session_locks = Arc::new(SessionLockMap::new());

    Ok(AppState {
        config,
        pipeline,
        store,
        sessions,
        retrieval,
        session_locks,
        transcripts,
    })
}

/// Spawn the periodic maintenance loops. Long-lived commands (`serve`,
/// `repl`) call this once after boot; one-shot commands skip it.
pub fn spawn_background_tasks(state: &AppState) {
    // ── Idle-session and expired-proposal sweep ──────────────────────
    {
        let sessions = state.sessions.clone();
        let pipeline = state.pipeline.clone();
        let idle_minutes = state.config.sessions.idle_minutes;
        let every = Duration::from_secs(state.config.sessions.sweep_interval_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let evicted = sessions.sweep_idle(idle_minutes).await;
                let expired = pipeline.sweep_proposals();
                if evicted + expired > 0 {
                    tracing::debug!(evicted, expired, "sweep pass");
                }
            }
        });
    }

    // ── Session-lock pruning ─────────────────────────────────────────
    {
        let session_locks = state.session_locks.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                session_locks.prune_idle();
            }
        });
    }
}
