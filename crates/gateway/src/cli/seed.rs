//! `crewagent seed`: demo-data ingestion.
//!
//! Reads a JSON array of employee records, inserts each into the
//! directory, and indexes its `raw_text` for retrieval. This is the
//! only path that writes to the vector index; conversational CRUD
//! changes structured fields, not indexed text.

use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;

use ca_directory::EmployeeDraft;
use ca_domain::config::Config;
use ca_retrieval::chunk_text;

use crate::bootstrap;

/// One record in the seed file. Only `name` is required.
#[derive(Debug, Deserialize)]
pub struct SeedRecord {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub raw_text: Option<String>,
}

impl SeedRecord {
    fn into_draft(self) -> EmployeeDraft {
        EmployeeDraft {
            name: self.name,
            email: self.email,
            phone: self.phone,
            department: self.department,
            position: self.position,
            raw_text: self.raw_text,
        }
    }
}

/// Parse a seed file's contents.
pub fn parse_seed(raw: &str) -> serde_json::Result<Vec<SeedRecord>> {
    serde_json::from_str(raw)
}

/// Load a seed file into the directory and index its text.
pub async fn seed(config: Arc<Config>, file: &str) -> anyhow::Result<()> {
    let state = bootstrap::build_app_state(config.clone()).await?;

    let raw = std::fs::read_to_string(file).with_context(|| format!("reading {file}"))?;
    let records = parse_seed(&raw).with_context(|| format!("parsing {file}"))?;
    if records.is_empty() {
        anyhow::bail!("{file} contains no records");
    }

    let mut inserted = 0usize;
    let mut indexed_chunks = 0usize;
    for record in records {
        let name = record.name.clone();
        let employee = state
            .store
            .insert(record.into_draft())
            .await
            .with_context(|| format!("inserting {name}"))?;
        inserted += 1;

        if let Some(text) = &employee.raw_text {
            let chunks = chunk_text(
                text,
                config.retrieval.chunk_size,
                config.retrieval.chunk_overlap,
            );
            indexed_chunks += chunks.len();
            state
                .retrieval
                .index(employee.id, chunks)
                .await
                .with_context(|| format!("indexing text for {name}"))?;
        }

        println!("{}  {}", employee.id, employee.name);
    }

    println!("Seeded {inserted} employee(s), {indexed_chunks} chunk(s) indexed.");
    Ok(())
}
