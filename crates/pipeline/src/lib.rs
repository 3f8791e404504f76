//! The conversational resolution and grounding pipeline.
//!
//! One utterance in, one reply out. Between the two sit the stages this
//! crate owns: lexical intent classification, entity resolution, the
//! guard chain, compound-query decomposition, grounded prompt assembly,
//! and the proposal-gated CRUD path. [`Pipeline::handle_turn`] is the
//! only entry point transports call; everything else is plumbing for it.
//!
//! Stage order is load-bearing. Guards run before any model call so a
//! clarification costs nothing; CRUD detection runs before compound
//! detection so a pasted multi-clause update is never split; the
//! session's active entity moves only in the end-of-turn commit so a
//! clarified turn leaves conversational context untouched.

pub mod cancel;
pub mod decompose;
pub mod guards;
pub mod intent;
pub mod prompt;
pub mod proposal;
pub mod resolve;
pub mod session_lock;
pub mod turn;

pub use cancel::{CancelMap, CancelToken};
pub use guards::{GuardInput, GuardKind, GuardOutcome};
pub use intent::{classify, IntentDecision};
pub use proposal::ProposalStore;
pub use session_lock::{SessionBusy, SessionLockMap};
pub use turn::Pipeline;
