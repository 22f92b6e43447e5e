//! Courtside Engine Library
//!
//! Core of the Courtside basketball analytics assistant. Used by the
//! `courtside` binary and by integration tests.

/// Configuration management module
pub mod config;

/// Read-only statistics database
pub mod db;

/// LLM provider abstraction layer
pub mod llm;

/// SQL tools exposed to the query agent
pub mod tools;

/// Schema-aware query agent
pub mod agent;

/// Chat pipeline orchestration
pub mod conductor;

/// HTTP API
pub mod api;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
