//! Typed state passed between conductor stages

use sdk::ResponsePath;
use std::fmt;

/// Supervisor decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Answer from the model alone
    DirectAnswer,
    /// Plan and run database sub-queries
    DbQuery,
    /// Close the conversation
    End,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::DirectAnswer => "direct_answer",
            Route::DbQuery => "db_query",
            Route::End => "__end__",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One natural-language question answerable by a single lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubQuery(String);

impl SubQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a sub-query inside the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubQueryStatus {
    Planned,
    Executing,
    Retrying,
    Succeeded,
    Failed,
}

impl SubQueryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubQueryStatus::Succeeded | SubQueryStatus::Failed)
    }
}

/// Failed-attempt counter for one sub-query.
///
/// Each failure produces a new value; nothing is shared between sub-queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Failed attempts so far
    pub retry_count: u32,
    /// Error text from the latest failed attempt
    pub last_error: Option<String>,
}

impl RetryState {
    /// State after one more failed attempt
    pub fn record_failure(&self, error: impl Into<String>) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            last_error: Some(error.into()),
        }
    }

    pub fn is_exhausted(&self, max_retries: u32) -> bool {
        self.retry_count >= max_retries
    }
}

/// Terminal result of executing one sub-query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubQueryOutcome {
    pub sub_query: SubQuery,
    pub status: SubQueryStatus,
    pub retry: RetryState,
    /// Agent answer when the sub-query succeeded
    pub result: Option<String>,
    /// Error list entry when it failed
    pub error: Option<String>,
}

impl SubQueryOutcome {
    pub fn succeeded(sub_query: SubQuery, retry: RetryState, result: String) -> Self {
        Self {
            sub_query,
            status: SubQueryStatus::Succeeded,
            retry,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(sub_query: SubQuery, retry: RetryState) -> Self {
        let error = format!(
            "Error querying '{}': {}",
            sub_query,
            retry.last_error.as_deref().unwrap_or("unknown error")
        );
        Self {
            sub_query,
            status: SubQueryStatus::Failed,
            retry,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SubQueryStatus::Succeeded
    }
}

/// Per-request pipeline state. Created for each request and dropped with it.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub question: String,
    /// One entry per succeeded sub-query, in plan order
    pub relevant_stats: Vec<String>,
    /// One entry per failed sub-query, in plan order
    pub errors: Vec<String>,
    /// Rendered memory context at request start
    pub memory: String,
    pub path: ResponsePath,
}

impl ConversationState {
    pub fn new(question: impl Into<String>, memory: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            relevant_stats: Vec::new(),
            errors: Vec::new(),
            memory: memory.into(),
            path: ResponsePath::Direct,
        }
    }

    /// Fold executor outcomes into the stats and error lists
    pub fn record(&mut self, outcomes: &[SubQueryOutcome]) {
        for outcome in outcomes {
            if let Some(result) = &outcome.result {
                self.relevant_stats.push(result.clone());
            }
            if let Some(error) = &outcome.error {
                self.errors.push(error.clone());
            }
        }
    }
}
