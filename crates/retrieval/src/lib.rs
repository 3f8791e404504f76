//! Similarity retrieval over indexed entity text.
//!
//! The pipeline consumes the [`RetrievalService`] trait; the reference
//! implementation is an in-memory cosine index ([`index::VectorIndex`])
//! whose embeddings come from the language-model provider. Ingestion
//! writes chunks in, turns read passages out.

pub mod chunk;
pub mod index;

use serde::{Deserialize, Serialize};

use ca_domain::error::Result;
use ca_domain::types::EmployeeId;

pub use chunk::chunk_text;
pub use index::VectorIndex;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Service trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One retrieved fragment of indexed text, scored against the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passage {
    pub text: String,
    pub entity_id: EmployeeId,
    pub score: f32,
}

#[async_trait::async_trait]
pub trait RetrievalService: Send + Sync {
    /// Rank indexed chunks against `query`, best first. An `entity_filter`
    /// restricts results to that entity's chunks.
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        entity_filter: Option<EmployeeId>,
    ) -> Result<Vec<Passage>>;

    /// Add chunks for an entity. Called by ingestion, never by the turn
    /// pipeline.
    async fn index(&self, entity_id: EmployeeId, chunks: Vec<String>) -> Result<()>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Fixed-passages stub
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Test double returning a pre-set passage list, with a call counter so
/// tests can assert retrieval was (or was not) consulted.
pub struct StaticRetrieval {
    passages: Vec<Passage>,
    calls: std::sync::atomic::AtomicUsize,
}

impl StaticRetrieval {
    pub fn empty() -> Self {
        Self::with_passages(Vec::new())
    }

    pub fn with_passages(passages: Vec<Passage>) -> Self {
        Self {
            passages,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn search_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RetrievalService for StaticRetrieval {
    async fn search(
        &self,
        _query: &str,
        top_k: usize,
        entity_filter: Option<EmployeeId>,
    ) -> Result<Vec<Passage>> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let hits = self
            .passages
            .iter()
            .filter(|p| entity_filter.map_or(true, |id| p.entity_id == id))
            .take(top_k)
            .cloned()
            .collect();
        Ok(hits)
    }

    async fn index(&self, _entity_id: EmployeeId, _chunks: Vec<String>) -> Result<()> {
        Ok(())
    }
}
