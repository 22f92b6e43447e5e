//! Wire types for the chat API
//!
//! These are the request/response contracts shared by the HTTP surface, the
//! CLI and any client. Field names match the JSON the frontend already reads.

use serde::{Deserialize, Serialize};

/// Body of `POST /chat`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    /// The user's question
    #[serde(default)]
    pub message: String,

    /// Conversation thread to continue. A fresh one is started when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

impl ChatRequest {
    /// Create a request that starts a new thread
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            thread_id: None,
        }
    }

    /// Continue an existing thread
    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }
}

/// Which pipeline branch produced a response
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponsePath {
    /// Answered from the model without touching the database
    Direct,

    /// Answered from executed sub-queries
    DbQuery,

    /// Reserved for chart payloads; no pipeline stage emits it yet
    Chart,

    /// The pipeline failed and a generic apology was returned
    Error,

    /// The conversation was closed
    End,
}

impl ResponsePath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponsePath::Direct => "direct",
            ResponsePath::DbQuery => "db_query",
            ResponsePath::Chart => "chart",
            ResponsePath::Error => "error",
            ResponsePath::End => "end",
        }
    }
}

/// Outcome flag for database-backed answers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Per-request sub-query counters
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryMetadata {
    pub queries_executed: usize,
    pub successful_queries: usize,
    pub failed_queries: usize,
}

/// Successful `/chat` response body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    /// Natural-language answer
    pub response: String,

    /// Thread this turn belongs to
    pub thread_id: String,

    /// Primary and comparison entity for the question
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevant_teams: Option<[String; 2]>,

    pub path: ResponsePath,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ResponseStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<QueryMetadata>,

    /// Errors from abandoned sub-queries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,

    /// Short description of a pipeline failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResponse {
    /// Minimal response for a path with no database work
    pub fn new(response: impl Into<String>, thread_id: impl Into<String>, path: ResponsePath) -> Self {
        Self {
            response: response.into(),
            thread_id: thread_id.into(),
            relevant_teams: None,
            path,
            status: None,
            metadata: None,
            errors: None,
            error: None,
        }
    }
}

/// Body returned with HTTP 4xx/5xx
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}

/// Body returned for `OPTIONS /chat`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreflightResponse {
    pub status: String,
}

impl Default for PreflightResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Health of one language-model provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderHealth {
    pub name: String,
    pub healthy: bool,
}

/// Body of `GET /status`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub version: String,
    pub tables: Vec<String>,
    pub providers: Vec<ProviderHealth>,
}
