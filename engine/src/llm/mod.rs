//! LLM Provider Abstraction Layer
//!
//! This module provides a common interface for interacting with language model
//! providers (OpenAI, Ollama). The LLMProvider trait defines the contract that all
//! providers must implement, enabling the LLM router to work with multiple providers
//! transparently.

use async_trait::async_trait;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod ollama;
pub mod openai;
pub mod router;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<LLMError> for EngineError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::Timeout => EngineError::LLMTimeout,
            LLMError::NetworkError(msg) => EngineError::Network(msg),
            other => EngineError::LLMProvider(other.to_string()),
        }
    }
}

/// Message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender (user, assistant, system, tool)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,

    /// Optional tool call ID for tool result messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_call_id: None,
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_call_id: None,
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            tool_call_id: None,
        }
    }

    /// Create a new tool result message
    pub fn tool_result(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,

    /// System message
    System,

    /// Tool result message
    Tool,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LLMResponse {
    /// LLM wants to call a tool
    ToolCall(ToolCall),

    /// LLM has provided a final answer
    FinalAnswer(FinalAnswer),
}

impl LLMResponse {
    /// Flatten the response to text.
    ///
    /// Callers that never advertise tools still get a usable string if the
    /// model emits something tool-shaped.
    pub fn into_text(self) -> String {
        match self {
            LLMResponse::FinalAnswer(answer) => answer.content,
            LLMResponse::ToolCall(call) => format!("{}({})", call.name, call.arguments),
        }
    }
}

/// Tool call request from the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,

    /// Name of the tool to call
    pub name: String,

    /// Arguments to pass to the tool (JSON string)
    pub arguments: String,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Final answer from the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalAnswer {
    /// The answer content
    pub content: String,
}

impl FinalAnswer {
    /// Create a new final answer
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "ollama", "openai")
    fn name(&self) -> &str;

    /// Returns the estimated cost in USD for the given token count
    /// Local providers should return 0.0
    fn estimated_cost(&self, tokens: usize) -> f64;

    /// Generate a response from the LLM
    ///
    /// # Arguments
    /// * `messages` - Conversation history including system prompt, user messages, and tool results
    ///
    /// # Returns
    /// * `Ok(LLMResponse)` - Either a tool call or final answer
    /// * `Err(LLMError)` - If the request fails
    async fn generate(&self, messages: &[Message]) -> Result<LLMResponse>;

    /// Check if the provider is currently healthy and available
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

/// Helper function to parse tool calls from string content.
///
/// Handles multiple LLM output formats:
/// 1. Raw JSON: `{"function": "...", "arguments": {...}}`
/// 2. Fenced JSON (with or without trailing text): ` ```json\n{...}\n``` `
/// 3. `<tool_call>name({...})</tool_call>` XML markers
/// 4. JSON embedded in prose, found by scanning for `{"function":`
pub fn parse_tool_calls(content: &str) -> Option<ToolCall> {
    let trimmed = content.trim();

    // Pattern 1: Raw JSON (entire content is valid JSON with "function" key)
    if let Some(tc) = try_parse_function_json(trimmed) {
        return Some(tc);
    }

    // Pattern 2: Extract from markdown code fences (even with trailing text)
    if let Some(inner) = extract_fenced_json(trimmed) {
        if let Some(tc) = try_parse_function_json(inner.trim()) {
            return Some(tc);
        }
    }

    // Pattern 3: <tool_call>name({...})</tool_call> XML markers
    if let Some(start) = trimmed.find("<tool_call>") {
        if let Some(end) = trimmed.find("</tool_call>") {
            if start + 11 <= end {
                let tool_content = &trimmed[start + 11..end];
                if let Some(paren_pos) = tool_content.find('(') {
                    let tool_name = &tool_content[..paren_pos];
                    let args_end = tool_content.rfind(')').unwrap_or(tool_content.len());
                    let arguments = &tool_content[paren_pos + 1..args_end.max(paren_pos + 1)];

                    return Some(ToolCall::new(
                        format!("call_{}", uuid::Uuid::new_v4()),
                        tool_name.trim(),
                        arguments,
                    ));
                }
            }
        }
    }

    // Pattern 4: Scan for {"function": anywhere in the content (LLM mixed prose + JSON)
    if let Some(pos) = trimmed.find("{\"function\"") {
        let candidate = &trimmed[pos..];
        if let Some(json_str) = extract_balanced_json(candidate) {
            if let Some(tc) = try_parse_function_json(json_str) {
                return Some(tc);
            }
        }
    }

    None
}

/// Locate the first JSON object in model output.
///
/// Accepts a bare object, a fenced block, or an object embedded in prose.
/// Used for structured outputs such as `{"questions": [...]}`.
pub fn extract_json_object(content: &str) -> Option<serde_json::Value> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if value.is_object() {
            return Some(value);
        }
    }

    if let Some(inner) = extract_fenced_json(trimmed) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(inner.trim()) {
            if value.is_object() {
                return Some(value);
            }
        }
    }

    let mut offset = 0;
    while let Some(pos) = trimmed[offset..].find('{') {
        let start = offset + pos;
        if let Some(json_str) = extract_balanced_json(&trimmed[start..]) {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(json_str) {
                return Some(value);
            }
        }
        offset = start + 1;
    }

    None
}

/// Try to parse a string as a `{"function": "...", "arguments": {...}}` tool call.
fn try_parse_function_json(s: &str) -> Option<ToolCall> {
    let json: serde_json::Value = serde_json::from_str(s).ok()?;
    let function = json.get("function")?.as_str()?;
    let arguments = json.get("arguments")?;
    Some(ToolCall::new(
        format!("call_{}", uuid::Uuid::new_v4()),
        function,
        arguments.to_string(),
    ))
}

/// Extract the body of the first markdown code fence in the text.
///
/// Works even when there is trailing prose after the closing ```.
/// Returns `None` if no fenced block is found.
fn extract_fenced_json(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_start_rel = after_opening.find('\n')? + 1;
    let body_start = fence_start + 3 + body_start_rel;

    let closing = content[body_start..].find("```")?;
    let body_end = body_start + closing;

    if body_start >= body_end {
        return None;
    }

    Some(&content[body_start..body_end])
}

/// Extract a balanced JSON object starting at position 0 of `s`.
///
/// Counts `{` / `}` depth, respecting string literals, to find the
/// matching close brace.
fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let user_msg = Message::user("Hello");
        assert_eq!(user_msg.role, MessageRole::User);
        assert_eq!(user_msg.content, "Hello");
        assert_eq!(user_msg.tool_call_id, None);

        let tool_msg = Message::tool_result("result", "call_123");
        assert_eq!(tool_msg.role, MessageRole::Tool);
        assert_eq!(tool_msg.tool_call_id, Some("call_123".to_string()));
    }

    #[test]
    fn test_parse_tool_calls_raw_json() {
        let content = r#"{"function": "sql_db_query", "arguments": {"query": "SELECT 1"}}"#;
        let call = parse_tool_calls(content).unwrap();
        assert_eq!(call.name, "sql_db_query");
        assert!(call.arguments.contains("SELECT 1"));
    }

    #[test]
    fn test_parse_tool_calls_fenced_with_prose() {
        let content = "Let me look.\n```json\n{\"function\": \"sql_db_list_tables\", \"arguments\": {}}\n```\nThen I'll query.";
        let call = parse_tool_calls(content).unwrap();
        assert_eq!(call.name, "sql_db_list_tables");
    }

    #[test]
    fn test_parse_tool_calls_marker_format() {
        let content = r#"<tool_call>sql_db_schema({"table_names": "PlayerStats"})</tool_call>"#;
        let call = parse_tool_calls(content).unwrap();
        assert_eq!(call.name, "sql_db_schema");
        assert!(call.arguments.contains("PlayerStats"));
    }

    #[test]
    fn test_parse_tool_calls_no_match() {
        assert!(parse_tool_calls("TY Johnson leads UC Davis with 18.2 points per game.").is_none());
        assert!(parse_tool_calls(r#"{"questions": ["a"]}"#).is_none());
    }

    #[test]
    fn test_extract_json_object_variants() {
        let raw = r#"{"questions": ["Who leads in scoring?"]}"#;
        assert!(extract_json_object(raw).is_some());

        let fenced = "```json\n{\"questions\": []}\n```";
        assert!(extract_json_object(fenced).is_some());

        let prose = "Sure! Here you go: {\"questions\": [\"a\", \"b\"]} Hope it helps.";
        let value = extract_json_object(prose).unwrap();
        assert_eq!(value["questions"].as_array().unwrap().len(), 2);

        assert!(extract_json_object("no json here").is_none());
    }

    #[test]
    fn test_extract_json_object_skips_unbalanced_prefix() {
        let content = "Use {braces} carefully: {\"teams\": [\"UC Irvine\"]}";
        let value = extract_json_object(content).unwrap();
        assert_eq!(value["teams"][0], "UC Irvine");
    }

    #[test]
    fn test_into_text() {
        let answer = LLMResponse::FinalAnswer(FinalAnswer::new("db_query"));
        assert_eq!(answer.into_text(), "db_query");

        let call = LLMResponse::ToolCall(ToolCall::new("id", "lookup", "{}"));
        assert_eq!(call.into_text(), "lookup({})");
    }

    #[test]
    fn test_llm_error_conversion() {
        let err: EngineError = LLMError::Timeout.into();
        assert!(matches!(err, EngineError::LLMTimeout));

        let err: EngineError = LLMError::RateLimitExceeded.into();
        assert!(matches!(err, EngineError::LLMProvider(_)));
    }
}
