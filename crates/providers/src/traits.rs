use ca_domain::error::Result;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How the caller wants the model to behave.
///
/// Extraction is for structured parsing (CRUD proposals, query
/// segmentation): temperature 0, fixed seed, so identical input parses
/// identically. Conversational is for grounded answers and social replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateMode {
    Extraction,
    Conversational,
}

impl GenerateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerateMode::Extraction => "extraction",
            GenerateMode::Conversational => "conversational",
        }
    }
}

/// A single-prompt completion request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub mode: GenerateMode,
}

impl GenerateRequest {
    pub fn extraction(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            mode: GenerateMode::Extraction,
        }
    }

    pub fn conversational(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            mode: GenerateMode::Conversational,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub text: String,
    /// The model that actually produced the response.
    pub model: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait every language model adapter implements.
///
/// `embed` exists because the reference retrieval index needs query and
/// chunk vectors from somewhere; a deployment with an external vector
/// service can leave it unimplemented behind its own `RetrievalService`.
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send one prompt and wait for the full completion.
    async fn generate(&self, req: GenerateRequest) -> Result<GenerateResponse>;

    /// Embed a batch of texts, one vector per input.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// A unique identifier for this provider instance.
    fn provider_id(&self) -> &str;
}
