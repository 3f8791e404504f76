//! Language model access for CrewAgent.
//!
//! The pipeline talks to exactly one trait: [`LanguageModel`]. The Ollama
//! adapter is the production implementation; [`ScriptedModel`] is the
//! deterministic stand-in used by tests and offline runs. JSON repair for
//! model output lives here too, next to the thing that produces it.

pub mod json;
pub mod ollama;
pub mod scripted;
pub mod traits;

pub use ollama::OllamaProvider;
pub use scripted::{ScriptedModel, ScriptedStep};
pub use traits::{GenerateMode, GenerateRequest, GenerateResponse, LanguageModel};
