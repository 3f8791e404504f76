use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Whole-process configuration, one section per concern. Every section
/// and every field defaults, so an absent or partial `config.toml` still
/// yields a runnable setup. File loading itself lives in the gateway;
/// this module only defines shape, defaults, env overrides, and checks.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_3210")]
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: d_host(),
            port: 3210,
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "d_cors_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: d_cors_origins(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Language model (Ollama)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Extraction mode pins temperature and seed so identical CRUD utterances
/// parse identically run over run; conversational mode samples normally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "d_ollama_url")]
    pub base_url: String,
    #[serde(default = "d_model")]
    pub model: String,
    #[serde(default = "d_embed_model")]
    pub embed_model: String,
    #[serde(default = "d_30000")]
    pub timeout_ms: u64,
    #[serde(default = "d_4096")]
    pub num_predict: u32,
    #[serde(default)]
    pub extraction_temperature: f32,
    #[serde(default = "d_42")]
    pub extraction_seed: u64,
    #[serde(default = "d_07")]
    pub chat_temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: d_ollama_url(),
            model: d_model(),
            embed_model: d_embed_model(),
            timeout_ms: 30_000,
            num_predict: 4096,
            extraction_temperature: 0.0,
            extraction_seed: 42,
            chat_temperature: 0.7,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Retrieval
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "d_5")]
    pub top_k: usize,
    /// The index scores `top_k * oversample_factor` rows before the
    /// entity filter is applied, so filtering never starves the result.
    #[serde(default = "d_5")]
    pub oversample_factor: usize,
    #[serde(default = "d_500")]
    pub chunk_size: usize,
    #[serde(default = "d_100")]
    pub chunk_overlap: usize,
    #[serde(default = "d_10000")]
    pub timeout_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            oversample_factor: 5,
            chunk_size: 500,
            chunk_overlap: 100,
            timeout_ms: 10_000,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Rolling history window, in exchanges (one user or assistant
    /// message each). Oldest evicted first.
    #[serde(default = "d_10")]
    pub window: usize,
    /// Sessions idle longer than this are dropped by the sweep.
    #[serde(default = "d_60")]
    pub idle_minutes: u32,
    #[serde(default = "d_300")]
    pub sweep_interval_secs: u64,
    /// When set, session state is rewritten here on every commit and
    /// reloaded on boot.
    #[serde(default)]
    pub persist_path: Option<PathBuf>,
    /// When set, every turn is appended to `<dir>/<session_id>.jsonl`.
    #[serde(default)]
    pub transcript_dir: Option<PathBuf>,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            window: 10,
            idle_minutes: 60,
            sweep_interval_secs: 300,
            persist_path: None,
            transcript_dir: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pipeline
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Utterances shorter than this trip the short-utterance guard
    /// (social intents are exempt).
    #[serde(default = "d_10")]
    pub short_utterance_min_chars: usize,
    /// How many known names a not-found clarification may list.
    #[serde(default = "d_5")]
    pub name_suggestion_limit: usize,
    /// Hard cap on decomposed subtasks per turn.
    #[serde(default = "d_5")]
    pub max_subtasks: usize,
    /// Unconfirmed proposals are dropped after this long.
    #[serde(default = "d_30")]
    pub pending_proposal_ttl_minutes: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            short_utterance_min_chars: 10,
            name_suggestion_limit: 5,
            max_subtasks: 5,
            pending_proposal_ttl_minutes: 30,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Directory
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DirectoryConfig {
    /// When set, the employee store is rewritten here on every mutation
    /// and reloaded on boot.
    #[serde(default)]
    pub persist_path: Option<PathBuf>,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicyKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicyKind {
    #[default]
    Off,
    NameEmail,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Env overrides & validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub field: String,
    pub severity: ConfigSeverity,
    pub message: String,
}

impl ConfigIssue {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            severity: ConfigSeverity::Error,
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            severity: ConfigSeverity::Warning,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Apply the operational environment overrides. Called by the gateway
    /// after the file (or defaults) are loaded, so env always wins.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Override application with an injectable lookup, so tests don't
    /// have to mutate process env.
    pub fn apply_overrides_from(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(url) = get("OLLAMA_API_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            self.llm.model = model;
        }
        if let Some(top_k) = get("RAG_TOP_K").and_then(|v| v.parse().ok()) {
            self.retrieval.top_k = top_k;
        }
        if let Some(size) = get("CHUNK_SIZE").and_then(|v| v.parse().ok()) {
            self.retrieval.chunk_size = size;
        }
        if let Some(overlap) = get("CHUNK_OVERLAP").and_then(|v| v.parse().ok()) {
            self.retrieval.chunk_overlap = overlap;
        }
    }

    /// Sanity-check the resolved configuration. Errors mean the process
    /// should not start; warnings are logged and tolerated.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.server.port == 0 {
            issues.push(ConfigIssue::error("server.port", "port must be non-zero"));
        }
        if self.llm.base_url.trim().is_empty() {
            issues.push(ConfigIssue::error("llm.base_url", "base_url is empty"));
        }
        if self.llm.timeout_ms == 0 {
            issues.push(ConfigIssue::error(
                "llm.timeout_ms",
                "a zero timeout fails every model call",
            ));
        }
        if self.retrieval.top_k == 0 {
            issues.push(ConfigIssue::warning(
                "retrieval.top_k",
                "top_k = 0 disables passage retrieval",
            ));
        }
        if self.retrieval.chunk_size == 0 {
            issues.push(ConfigIssue::error(
                "retrieval.chunk_size",
                "chunk_size must be non-zero",
            ));
        } else if self.retrieval.chunk_overlap >= self.retrieval.chunk_size {
            issues.push(ConfigIssue::error(
                "retrieval.chunk_overlap",
                "overlap must be smaller than chunk_size",
            ));
        }
        if self.sessions.window == 0 {
            issues.push(ConfigIssue::error(
                "sessions.window",
                "history window must hold at least one exchange",
            ));
        }
        if self.sessions.idle_minutes == 0 {
            issues.push(ConfigIssue::warning(
                "sessions.idle_minutes",
                "sessions are evicted on the first sweep",
            ));
        }
        if self.pipeline.max_subtasks == 0 {
            issues.push(ConfigIssue::error(
                "pipeline.max_subtasks",
                "decomposition needs room for at least one subtask",
            ));
        }
        if self.pipeline.short_utterance_min_chars == 0 {
            issues.push(ConfigIssue::warning(
                "pipeline.short_utterance_min_chars",
                "short-utterance guard is disabled",
            ));
        }

        issues
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Default value helpers (serde)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_3210() -> u16 {
    3210
}
fn d_cors_origins() -> Vec<String> {
    vec!["http://localhost:*".into(), "http://127.0.0.1:*".into()]
}
fn d_ollama_url() -> String {
    "http://localhost:11434".into()
}
fn d_model() -> String {
    "qwen2.5:7b-instruct".into()
}
fn d_embed_model() -> String {
    "nomic-embed-text".into()
}
fn d_30000() -> u64 {
    30_000
}
fn d_4096() -> u32 {
    4096
}
fn d_42() -> u64 {
    42
}
fn d_07() -> f32 {
    0.7
}
fn d_5() -> usize {
    5
}
fn d_500() -> usize {
    500
}
fn d_100() -> usize {
    100
}
fn d_10000() -> u64 {
    10_000
}
fn d_10() -> usize {
    10
}
fn d_60() -> u32 {
    60
}
fn d_300() -> u64 {
    300
}
fn d_30() -> u32 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_win_over_defaults() {
        let mut config = Config::default();
        config.apply_overrides_from(|name| match name {
            "OLLAMA_API_URL" => Some("http://gpu-box:11434".into()),
            "OLLAMA_MODEL" => Some("llama3.1:8b".into()),
            "RAG_TOP_K" => Some("8".into()),
            _ => None,
        });
        assert_eq!(config.llm.base_url, "http://gpu-box:11434");
        assert_eq!(config.llm.model, "llama3.1:8b");
        assert_eq!(config.retrieval.top_k, 8);
        // Untouched sections keep their defaults.
        assert_eq!(config.retrieval.chunk_size, 500);
    }

    #[test]
    fn unparseable_numeric_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides_from(|name| match name {
            "RAG_TOP_K" => Some("lots".into()),
            "CHUNK_SIZE" => Some("600".into()),
            _ => None,
        });
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.chunk_size, 600);
    }

    #[test]
    fn zero_window_is_a_hard_error() {
        let mut config = Config::default();
        config.sessions.window = 0;
        let issues = config.validate();
        assert!(issues
            .iter()
            .any(|i| i.field == "sessions.window" && i.severity == ConfigSeverity::Error));
    }

    #[test]
    fn zero_top_k_is_only_a_warning() {
        let mut config = Config::default();
        config.retrieval.top_k = 0;
        let issues = config.validate();
        let issue = issues
            .iter()
            .find(|i| i.field == "retrieval.top_k")
            .expect("top_k issue");
        assert_eq!(issue.severity, ConfigSeverity::Warning);
    }
}
