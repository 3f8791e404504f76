use ca_domain::config::{Config, ConfigSeverity, DuplicatePolicyKind};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 3210);
}

#[test]
fn explicit_zero_host_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 3210
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
}

#[test]
fn default_cors_allows_only_localhost() {
    let config = Config::default();
    assert!(config
        .server
        .cors
        .allowed_origins
        .contains(&"http://localhost:*".to_string()));
    assert!(config
        .server
        .cors
        .allowed_origins
        .contains(&"http://127.0.0.1:*".to_string()));
}

#[test]
fn llm_defaults_match_local_ollama() {
    let config = Config::default();
    assert_eq!(config.llm.base_url, "http://localhost:11434");
    assert_eq!(config.llm.model, "qwen2.5:7b-instruct");
    assert_eq!(config.llm.embed_model, "nomic-embed-text");
    assert_eq!(config.llm.extraction_temperature, 0.0);
    assert_eq!(config.llm.extraction_seed, 42);
    assert_eq!(config.llm.num_predict, 4096);
}

#[test]
fn retrieval_defaults() {
    let config = Config::default();
    assert_eq!(config.retrieval.top_k, 5);
    assert_eq!(config.retrieval.oversample_factor, 5);
    assert_eq!(config.retrieval.chunk_size, 500);
    assert_eq!(config.retrieval.chunk_overlap, 100);
}

#[test]
fn session_window_defaults_to_ten() {
    let config = Config::default();
    assert_eq!(config.sessions.window, 10);
    assert_eq!(config.sessions.idle_minutes, 60);
}

#[test]
fn pipeline_defaults() {
    let config = Config::default();
    assert_eq!(config.pipeline.short_utterance_min_chars, 10);
    assert_eq!(config.pipeline.name_suggestion_limit, 5);
    assert_eq!(config.pipeline.max_subtasks, 5);
}

#[test]
fn duplicate_policy_defaults_off_and_parses() {
    let config = Config::default();
    assert_eq!(config.directory.duplicate_policy, DuplicatePolicyKind::Off);

    let toml_str = r#"
[directory]
duplicate_policy = "name_email"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(
        config.directory.duplicate_policy,
        DuplicatePolicyKind::NameEmail
    );
}

#[test]
fn partial_file_fills_missing_sections_with_defaults() {
    let toml_str = r#"
[llm]
model = "llama3.1:8b"

[sessions]
window = 4
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.llm.model, "llama3.1:8b");
    assert_eq!(config.llm.base_url, "http://localhost:11434");
    assert_eq!(config.sessions.window, 4);
    assert_eq!(config.retrieval.top_k, 5);
}

#[test]
fn validate_flags_bad_values() {
    let mut config = Config::default();
    config.server.port = 0;
    config.retrieval.chunk_overlap = config.retrieval.chunk_size;
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|e| e.field == "server.port" && e.severity == ConfigSeverity::Error));
    assert!(issues
        .iter()
        .any(|e| e.field == "retrieval.chunk_overlap" && e.severity == ConfigSeverity::Error));
}

#[test]
fn validate_clean_default_config() {
    let issues = Config::default().validate();
    assert!(
        issues.iter().all(|e| e.severity != ConfigSeverity::Error),
        "default config must not carry hard errors: {issues:?}"
    );
}
