//! In-memory cosine-similarity index, the reference [`RetrievalService`].
//!
//! Rows are (entity_id, text, embedding) with embeddings normalized on
//! insert, so ranking is a dot product. Search oversamples before the
//! entity filter: the best `top_k * oversample_factor` rows overall are
//! taken first, then filtered, then truncated to `top_k`. A filtered
//! search therefore returns fewer than `top_k` passages when the entity's
//! chunks are not globally competitive, which is the intended behavior
//! for "is there anything relevant at all" grounding.

use std::sync::Arc;

use parking_lot::RwLock;

use ca_domain::error::{Error, Result};
use ca_domain::types::EmployeeId;
use ca_providers::LanguageModel;

use crate::{Passage, RetrievalService};

struct Row {
    entity_id: EmployeeId,
    text: String,
    embedding: Vec<f32>,
}

pub struct VectorIndex {
    model: Arc<dyn LanguageModel>,
    rows: RwLock<Vec<Row>>,
    oversample_factor: usize,
}

impl VectorIndex {
    pub fn new(model: Arc<dyn LanguageModel>, oversample_factor: usize) -> Self {
        Self {
            model,
            rows: RwLock::new(Vec::new()),
            oversample_factor: oversample_factor.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.model.embed(&[text.to_string()]).await?;
        let vector = vectors.pop().ok_or_else(|| Error::Provider {
            provider: self.model.provider_id().to_string(),
            message: "empty embedding response".into(),
        })?;
        Ok(normalize(vector))
    }
}

fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[async_trait::async_trait]
impl RetrievalService for VectorIndex {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        entity_filter: Option<EmployeeId>,
    ) -> Result<Vec<Passage>> {
        if top_k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        let query_vec = self.embed_one(query).await?;

        let rows = self.rows.read();
        let mut scored: Vec<(f32, usize)> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (dot(&query_vec, &row.embedding), i))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let oversample = (top_k * self.oversample_factor).min(scored.len());
        let passages: Vec<Passage> = scored[..oversample]
            .iter()
            .filter(|(_, i)| entity_filter.map_or(true, |id| rows[*i].entity_id == id))
            .take(top_k)
            .map(|(score, i)| Passage {
                text: rows[*i].text.clone(),
                entity_id: rows[*i].entity_id,
                score: *score,
            })
            .collect();

        Ok(passages)
    }

    async fn index(&self, entity_id: EmployeeId, chunks: Vec<String>) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let vectors = self.model.embed(&chunks).await?;
        if vectors.len() != chunks.len() {
            return Err(Error::Provider {
                provider: self.model.provider_id().to_string(),
                message: format!(
                    "embedding count mismatch: {} texts, {} vectors",
                    chunks.len(),
                    vectors.len()
                ),
            });
        }

        let mut rows = self.rows.write();
        if let Some(first) = rows.first() {
            let dim = first.embedding.len();
            if vectors.iter().any(|v| v.len() != dim) {
                return Err(Error::Store("embedding dimension mismatch".into()));
            }
        }
        for (text, vector) in chunks.into_iter().zip(vectors) {
            rows.push(Row {
                entity_id,
                text,
                embedding: normalize(vector),
            });
        }
        tracing::debug!(entity_id = %entity_id, rows = rows.len(), "chunks indexed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ca_providers::ScriptedModel;

    #[tokio::test]
    async fn empty_index_returns_nothing() {
        let idx = VectorIndex::new(Arc::new(ScriptedModel::new()), 5);
        let hits = idx.search("anything", 5, None).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn exact_text_ranks_first() {
        let idx = VectorIndex::new(Arc::new(ScriptedModel::new()), 5);
        idx.index(
            EmployeeId(1),
            vec![
                "python developer with ml background".to_string(),
                "accountant handling payroll".to_string(),
            ],
        )
        .await
        .unwrap();

        let hits = idx
            .search("python developer with ml background", 2, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].text.contains("python"));
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn entity_filter_restricts_results() {
        let idx = VectorIndex::new(Arc::new(ScriptedModel::new()), 5);
        idx.index(EmployeeId(1), vec!["java spring services".to_string()])
            .await
            .unwrap();
        idx.index(EmployeeId(2), vec!["java kafka pipelines".to_string()])
            .await
            .unwrap();

        let hits = idx
            .search("java", 5, Some(EmployeeId(2)))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity_id, EmployeeId(2));
    }

    #[tokio::test]
    async fn top_k_truncates() {
        let idx = VectorIndex::new(Arc::new(ScriptedModel::new()), 5);
        let chunks: Vec<String> = (0..8).map(|i| format!("chunk number {i}")).collect();
        idx.index(EmployeeId(1), chunks).await.unwrap();

        let hits = idx.search("chunk number", 3, None).await.unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn indexing_nothing_is_a_no_op() {
        let idx = VectorIndex::new(Arc::new(ScriptedModel::new()), 5);
        idx.index(EmployeeId(1), Vec::new()).await.unwrap();
        assert!(idx.is_empty());
    }

    #[test]
    fn normalize_produces_unit_vectors() {
        let v = normalize(vec![3.0, 4.0]);
        let norm = (v[0] * v[0] + v[1] * v[1]).sqrt();
        assert!((norm - 1.0).abs() < 1e-6);

        // Zero vector stays zero instead of dividing by zero.
        let z = normalize(vec![0.0, 0.0]);
        assert_eq!(z, vec![0.0, 0.0]);
    }

    #[tokio::test]
    async fn rows_accumulate_across_entities() {
        let idx = VectorIndex::new(Arc::new(ScriptedModel::new()), 5);
        idx.index(EmployeeId(1), vec!["first".to_string()])
            .await
            .unwrap();
        idx.index(
            EmployeeId(2),
            vec!["second".to_string(), "third".to_string()],
        )
        .await
        .unwrap();
        assert_eq!(idx.len(), 3);
    }
}
