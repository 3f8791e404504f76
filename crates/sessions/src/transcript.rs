//! Append-only JSONL transcripts, one `<session_id>.jsonl` per session.
//!
//! The session window forgets old exchanges; transcripts do not. Every
//! committed turn is appended here as audit history, through an in-memory
//! write-through cache so reads after the first never hit disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use ca_domain::error::{Error, Result};
use ca_domain::trace::TraceEvent;
use ca_domain::types::Exchange;

/// A single transcript line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub timestamp: String,
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl TranscriptLine {
    pub fn from_exchange(exchange: &Exchange) -> Self {
        Self {
            timestamp: exchange.timestamp.to_rfc3339(),
            role: exchange.role.as_str().to_owned(),
            content: exchange.text.clone(),
            metadata: None,
        }
    }

    /// Line stamped now, for events that are not conversation exchanges
    /// (e.g. a proposal confirmation).
    pub fn event(role: &str, content: &str, metadata: serde_json::Value) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            role: role.to_owned(),
            content: content.to_owned(),
            metadata: Some(metadata),
        }
    }
}

/// Appends JSONL transcript files with a write-through cache.
pub struct TranscriptWriter {
    base_dir: PathBuf,
    cache: RwLock<HashMap<String, Vec<TranscriptLine>>>,
}

impl TranscriptWriter {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Append a turn's exchanges to the session transcript. File I/O runs
    /// on a blocking thread; the cache is only updated when I/O succeeds.
    pub async fn append_exchanges(
        &self,
        session_id: &str,
        exchanges: &[Exchange],
    ) -> Result<()> {
        let lines: Vec<TranscriptLine> =
            exchanges.iter().map(TranscriptLine::from_exchange).collect();
        self.append_lines(session_id, lines).await
    }

    pub async fn append_lines(
        &self,
        session_id: &str,
        lines: Vec<TranscriptLine>,
    ) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }

        let buf = serialize_lines(&lines)?;
        let path = self.path_for(session_id);
        let dir = self.base_dir.clone();

        tokio::task::spawn_blocking(move || {
            use std::io::Write;
            std::fs::create_dir_all(&dir).map_err(Error::Io)?;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(Error::Io)?;
            file.write_all(buf.as_bytes()).map_err(Error::Io)?;
            Ok::<(), Error>(())
        })
        .await
        .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))??;

        {
            // Extend only an already-loaded entry. Seeding a fresh entry
            // here would hide older on-disk lines from the first read.
            let mut cache = self.cache.write();
            if let Some(cached) = cache.get_mut(session_id) {
                cached.extend(lines.iter().cloned());
            }
        }

        TraceEvent::TranscriptAppend {
            session_id: session_id.to_owned(),
            lines: lines.len(),
        }
        .emit();

        Ok(())
    }

    /// Read a transcript back, via the cache after the first load.
    pub async fn read(&self, session_id: &str) -> Result<Vec<TranscriptLine>> {
        {
            let cache = self.cache.read();
            if let Some(lines) = cache.get(session_id) {
                return Ok(lines.clone());
            }
        }

        let path = self.path_for(session_id);
        let sid = session_id.to_owned();
        let lines = tokio::task::spawn_blocking(move || read_jsonl_file(&path, &sid))
            .await
            .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))??;

        {
            let mut cache = self.cache.write();
            cache.insert(session_id.to_owned(), lines.clone());
        }
        Ok(lines)
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.base_dir.join(format!("{session_id}.jsonl"))
    }
}

fn serialize_lines(lines: &[TranscriptLine]) -> Result<String> {
    let mut buf = String::new();
    for line in lines {
        let json = serde_json::to_string(line)
            .map_err(|e| Error::Other(format!("serializing transcript line: {e}")))?;
        buf.push_str(&json);
        buf.push('\n');
    }
    Ok(buf)
}

fn read_jsonl_file(path: &Path, session_id: &str) -> Result<Vec<TranscriptLine>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
    let mut lines = Vec::new();
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<TranscriptLine>(line) {
            Ok(tl) => lines.push(tl),
            Err(e) => {
                tracing::warn!(
                    session_id = session_id,
                    error = %e,
                    "skipping malformed transcript line"
                );
            }
        }
    }
    Ok(lines)
}
