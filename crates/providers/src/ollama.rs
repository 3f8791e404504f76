//! Ollama adapter.
//!
//! Talks to a local Ollama daemon over its native HTTP API: `/api/generate`
//! for completions and `/api/embeddings` for vectors. Extraction-mode
//! requests pin temperature and seed so structured parsing is repeatable.

use serde::{Deserialize, Serialize};

use ca_domain::config::LlmConfig;
use ca_domain::error::{Error, Result};

use crate::traits::{GenerateMode, GenerateRequest, GenerateResponse, LanguageModel};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct OllamaProvider {
    base_url: String,
    model: String,
    embed_model: String,
    num_predict: u32,
    extraction_temperature: f32,
    extraction_seed: u64,
    chat_temperature: f32,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            embed_model: cfg.embed_model.clone(),
            num_predict: cfg.num_predict,
            extraction_temperature: cfg.extraction_temperature,
            extraction_seed: cfg.extraction_seed,
            chat_temperature: cfg.chat_temperature,
            client,
        })
    }

    fn options_for(&self, mode: GenerateMode) -> GenerateOptions {
        match mode {
            GenerateMode::Extraction => GenerateOptions {
                temperature: self.extraction_temperature,
                num_predict: self.num_predict,
                seed: Some(self.extraction_seed),
            },
            GenerateMode::Conversational => GenerateOptions {
                temperature: self.chat_temperature,
                num_predict: self.num_predict,
                seed: None,
            },
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire format
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

#[derive(Deserialize)]
struct GenerateReply {
    response: String,
}

#[derive(Serialize)]
struct EmbeddingsBody<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsReply {
    embedding: Vec<f32>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LanguageModel impl
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LanguageModel for OllamaProvider {
    async fn generate(&self, req: GenerateRequest) -> Result<GenerateResponse> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateBody {
            model: &self.model,
            prompt: &req.prompt,
            stream: false,
            options: self.options_for(req.mode),
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(Error::Provider {
                provider: "ollama".into(),
                message: format!("{status}: {detail}"),
            });
        }

        let reply: GenerateReply = resp.json().await.map_err(from_reqwest)?;
        Ok(GenerateResponse {
            text: reply.response,
            model: self.model.clone(),
        })
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let mut vectors = Vec::with_capacity(texts.len());

        // The embeddings endpoint takes one prompt per call.
        for text in texts {
            let body = EmbeddingsBody {
                model: &self.embed_model,
                prompt: text,
            };
            let resp = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(from_reqwest)?;

            let status = resp.status();
            if !status.is_success() {
                let detail = resp.text().await.unwrap_or_default();
                return Err(Error::Provider {
                    provider: "ollama".into(),
                    message: format!("embeddings {status}: {detail}"),
                });
            }

            let reply: EmbeddingsReply = resp.json().await.map_err(from_reqwest)?;
            vectors.push(reply.embedding);
        }

        Ok(vectors)
    }

    fn provider_id(&self) -> &str {
        "ollama"
    }
}

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ca_domain::config::LlmConfig;

    fn provider() -> OllamaProvider {
        OllamaProvider::from_config(&LlmConfig::default()).unwrap()
    }

    #[test]
    fn extraction_options_pin_temperature_and_seed() {
        let opts = provider().options_for(GenerateMode::Extraction);
        assert_eq!(opts.temperature, 0.0);
        assert_eq!(opts.seed, Some(42));
        assert_eq!(opts.num_predict, 4096);
    }

    #[test]
    fn conversational_options_sample_unseeded() {
        let opts = provider().options_for(GenerateMode::Conversational);
        assert!(opts.temperature > 0.0);
        assert_eq!(opts.seed, None);
    }

    #[test]
    fn generate_body_serializes_without_seed_when_absent() {
        let body = GenerateBody {
            model: "m",
            prompt: "p",
            stream: false,
            options: GenerateOptions {
                temperature: 0.7,
                num_predict: 128,
                seed: None,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert!(json["options"].get("seed").is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let cfg = LlmConfig {
            base_url: "http://localhost:11434/".into(),
            ..Default::default()
        };
        let p = OllamaProvider::from_config(&cfg).unwrap();
        assert_eq!(p.base_url, "http://localhost:11434");
    }
}
