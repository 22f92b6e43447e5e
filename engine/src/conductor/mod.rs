//! Conductor System
//!
//! Routes a chat turn through supervisor, planner, executor and synthesizer,
//! with per-thread conversation memory alongside.

pub mod executor;
pub mod memory;
pub mod pipeline;
pub mod planner;
pub mod resolver;
pub mod supervisor;
pub mod synthesizer;
pub mod types;

pub use executor::Executor;
pub use memory::{Actor, ConversationMemory, MemoryEntry, MemoryStore};
pub use pipeline::Conductor;
pub use planner::Planner;
pub use resolver::TeamResolver;
pub use supervisor::{classify_route, Supervisor};
pub use synthesizer::{Synthesizer, FALLBACK_APOLOGY};
pub use types::{ConversationState, RetryState, Route, SubQuery, SubQueryOutcome, SubQueryStatus};
