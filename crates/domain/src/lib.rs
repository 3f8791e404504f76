//! Shared domain types for CrewAgent.
//!
//! Everything the pipeline crates agree on lives here: the employee and
//! session data model, the intent/resolution/proposal vocabulary, the
//! crate-wide error type, structured trace events, and configuration.

pub mod config;
pub mod error;
pub mod trace;
pub mod types;

pub use error::{Error, Result};
