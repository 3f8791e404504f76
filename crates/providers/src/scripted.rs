//! Deterministic scripted provider.
//!
//! Replays a queue of canned steps instead of calling a model. Tests use
//! it to assert call counts (a guard short-circuit must mean zero model
//! calls) and to drive extraction retries; the REPL can use it for fully
//! offline demos.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use ca_domain::error::{Error, Result};

use crate::traits::{GenerateRequest, GenerateResponse, LanguageModel};

/// One scripted response step.
#[derive(Debug, Clone)]
pub enum ScriptedStep {
    Reply(String),
    /// Simulate an upstream timeout.
    Timeout,
    /// Simulate a provider-side failure.
    Fail(String),
}

pub struct ScriptedModel {
    steps: Mutex<VecDeque<ScriptedStep>>,
    prompts: Mutex<Vec<String>>,
    embed_calls: AtomicUsize,
    /// Returned when the queue is empty; `None` makes an empty queue an
    /// error so strict tests notice unexpected calls.
    default_reply: Option<String>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            embed_calls: AtomicUsize::new(0),
            default_reply: Some("Okay.".into()),
        }
    }

    /// A model where every unqueued call fails the test loudly.
    pub fn strict() -> Self {
        Self {
            default_reply: None,
            ..Self::new()
        }
    }

    pub fn push(&self, step: ScriptedStep) -> &Self {
        self.steps.lock().push_back(step);
        self
    }

    pub fn push_reply(&self, text: impl Into<String>) -> &Self {
        self.push(ScriptedStep::Reply(text.into()))
    }

    /// Number of `generate` calls seen so far.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn embed_call_count(&self) -> usize {
        self.embed_calls.load(Ordering::Relaxed)
    }

    /// Every prompt received, in order. Lets tests assert on payload
    /// structure (instruction block first, utterance last).
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, req: GenerateRequest) -> Result<GenerateResponse> {
        self.prompts.lock().push(req.prompt);

        let step = self.steps.lock().pop_front();
        let text = match step {
            Some(ScriptedStep::Reply(text)) => text,
            Some(ScriptedStep::Timeout) => {
                return Err(Error::Timeout("scripted timeout".into()));
            }
            Some(ScriptedStep::Fail(message)) => {
                return Err(Error::Provider {
                    provider: "scripted".into(),
                    message,
                });
            }
            None => match &self.default_reply {
                Some(text) => text.clone(),
                None => {
                    return Err(Error::Provider {
                        provider: "scripted".into(),
                        message: "unexpected generate call (queue empty)".into(),
                    });
                }
            },
        };

        Ok(GenerateResponse {
            text,
            model: "scripted".into(),
        })
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed_calls.fetch_add(1, Ordering::Relaxed);
        Ok(texts.iter().map(|t| pseudo_embedding(t)).collect())
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }
}

/// Cheap deterministic embedding: token hashes folded into a small dense
/// vector. Similar texts share tokens, so cosine ranking behaves sanely
/// enough for tests.
fn pseudo_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; 16];
    for token in text.to_lowercase().split_whitespace() {
        let mut hash: u64 = 1469598103934665603;
        for byte in token.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(1099511628211);
        }
        let slot = (hash % 16) as usize;
        vector[slot] += 1.0;
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::GenerateRequest;

    #[tokio::test]
    async fn replays_queue_in_order() {
        let model = ScriptedModel::new();
        model.push_reply("first").push_reply("second");

        let a = model
            .generate(GenerateRequest::conversational("one"))
            .await
            .unwrap();
        let b = model
            .generate(GenerateRequest::conversational("two"))
            .await
            .unwrap();
        assert_eq!(a.text, "first");
        assert_eq!(b.text, "second");
        assert_eq!(model.call_count(), 2);
        assert_eq!(model.prompts(), vec!["one".to_string(), "two".to_string()]);
    }

    #[tokio::test]
    async fn empty_queue_falls_back_to_default() {
        let model = ScriptedModel::new();
        let reply = model
            .generate(GenerateRequest::conversational("hi"))
            .await
            .unwrap();
        assert_eq!(reply.text, "Okay.");
    }

    #[tokio::test]
    async fn strict_mode_errors_on_unqueued_call() {
        let model = ScriptedModel::strict();
        let err = model
            .generate(GenerateRequest::conversational("hi"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unexpected"));
    }

    #[tokio::test]
    async fn scripted_failures_surface_as_errors() {
        let model = ScriptedModel::new();
        model.push(ScriptedStep::Timeout);
        let err = model
            .generate(GenerateRequest::conversational("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn embeddings_are_deterministic() {
        let model = ScriptedModel::new();
        let texts = vec!["rust and tokio".to_string()];
        let a = model.embed(&texts).await.unwrap();
        let b = model.embed(&texts).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(model.embed_call_count(), 2);
    }
}
