//! Conversation Memory
//!
//! Append-only log of turns per conversation thread. Rendering a context only
//! reads the last `window` entries; older entries stay in the log.
//!
//! The store holds at most `max_threads` threads. Starting a thread beyond
//! that drops the least recently used one as a whole; a live thread never
//! loses entries.

use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;
use tracing::debug;

/// Thread limit used by [`MemoryStore::default`]
pub const DEFAULT_MAX_THREADS: usize = 1000;

/// Who produced a memory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Human,
    Assistant,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Human => write!(f, "HUMAN"),
            Actor::Assistant => write!(f, "ASSISTANT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEntry {
    pub actor: Actor,
    pub text: String,
}

/// Turns for a single thread, oldest first
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    entries: Vec<MemoryEntry>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, actor: Actor, text: impl Into<String>) {
        self.entries.push(MemoryEntry {
            actor,
            text: text.into(),
        });
    }

    /// The last `window` entries as `ACTOR: text` lines, oldest first.
    pub fn context(&self, window: usize) -> String {
        let skip = self.entries.len().saturating_sub(window);
        self.entries[skip..]
            .iter()
            .map(|e| format!("{}: {}", e.actor, e.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
struct Thread {
    memory: ConversationMemory,
    /// Value of the store's turn counter at the last append
    last_turn: u64,
}

#[derive(Debug, Default)]
struct Threads {
    by_id: HashMap<String, Thread>,
    turn: u64,
}

/// Thread id -> memory, shared by all requests
#[derive(Debug)]
pub struct MemoryStore {
    threads: RwLock<Threads>,
    max_threads: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_THREADS)
    }
}

impl MemoryStore {
    /// A store keeping at most `max_threads` threads (at least one).
    pub fn new(max_threads: usize) -> Self {
        Self {
            threads: RwLock::new(Threads::default()),
            max_threads: max_threads.max(1),
        }
    }

    /// Rendered context for a thread; empty for unknown threads
    pub async fn context(&self, thread_id: &str, window: usize) -> String {
        self.threads
            .read()
            .await
            .by_id
            .get(thread_id)
            .map(|t| t.memory.context(window))
            .unwrap_or_default()
    }

    pub async fn append(&self, thread_id: &str, actor: Actor, text: impl Into<String>) {
        let mut threads = self.threads.write().await;
        threads.turn += 1;
        let turn = threads.turn;

        if !threads.by_id.contains_key(thread_id) && threads.by_id.len() >= self.max_threads {
            let oldest = threads
                .by_id
                .iter()
                .min_by_key(|(_, t)| t.last_turn)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                threads.by_id.remove(&oldest);
                debug!(thread_id = %oldest, "Evicted least recently used thread");
            }
        }

        let thread = threads.by_id.entry(thread_id.to_string()).or_default();
        thread.memory.append(actor, text);
        thread.last_turn = turn;
    }

    pub async fn thread_count(&self) -> usize {
        self.threads.read().await.by_id.len()
    }
}
