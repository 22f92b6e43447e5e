//! Courtside SDK
//!
//! Shared error taxonomy and wire types for Courtside components.
//! This crate is used by the engine and by API clients.

/// Error types and handling
pub mod errors;

/// Chat API request/response types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, EngineErrorExt};
pub use types::{
    ChatRequest, ChatResponse, ErrorResponse, PreflightResponse, ProviderHealth, QueryMetadata,
    ResponsePath, ResponseStatus, StatusResponse,
};
