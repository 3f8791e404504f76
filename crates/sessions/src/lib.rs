//! Session context management.
//!
//! A session is the unit of conversational continuity: a bounded history
//! window, the currently active entity, and at most one pending proposal.
//! Turns never mutate a session piecemeal; they build a [`TurnCommit`]
//! and apply it in one shot at the end of the turn.

pub mod store;
pub mod transcript;

pub use store::{MemorySessionStore, Session, SessionStore, TurnCommit, Update};
pub use transcript::{TranscriptLine, TranscriptWriter};
