//! SQL Agent
//!
//! Think-act-observe loop over the statistics database:
//!
//! 1. Call the LLM router with the transcript so far
//! 2. If tool call: dispatch it, append the result, continue
//! 3. If final answer: append it and return the transcript
//!
//! The loop is bounded by `assistant.max_agent_iterations`. Per-call timeouts
//! are applied by the router.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use super::QueryAgent;
use crate::llm::router::LLMRouter;
use crate::llm::{LLMResponse, Message};
use crate::tools::ToolRegistry;
use sdk::errors::EngineError;

/// Agent that answers questions by querying the statistics database
pub struct SqlAgent {
    /// LLM router for provider selection
    router: Arc<LLMRouter>,

    /// SQL tools
    tools: ToolRegistry,

    /// Row limit the model is told to apply
    top_k: usize,

    /// Tool-loop bound per invocation
    max_iterations: usize,
}

impl SqlAgent {
    pub fn new(
        router: Arc<LLMRouter>,
        tools: ToolRegistry,
        top_k: usize,
        max_iterations: usize,
    ) -> Self {
        Self {
            router,
            tools,
            top_k,
            max_iterations,
        }
    }
}

#[async_trait]
impl QueryAgent for SqlAgent {
    async fn usable_table_names(&self) -> Result<Vec<String>, EngineError> {
        self.tools.database().usable_table_names().await
    }

    async fn table_info(&self) -> Result<String, EngineError> {
        self.tools.database().table_info(None).await
    }

    async fn invoke(&self, messages: Vec<Message>) -> Result<Vec<Message>, EngineError> {
        let start = Instant::now();

        let mut transcript = Vec::with_capacity(messages.len() + 1 + self.max_iterations * 2);
        transcript.push(Message::system(self.tools.system_prompt(self.top_k)));
        transcript.extend(messages);

        let mut tool_calls = 0usize;

        for iteration in 1..=self.max_iterations {
            debug!("SQL agent iteration {}/{}", iteration, self.max_iterations);

            let (response, provider) = self.router.call(&transcript).await?;

            match response {
                LLMResponse::ToolCall(tool_call) => {
                    debug!(
                        "Tool call via {}: {} ({})",
                        provider, tool_call.name, tool_call.id
                    );
                    tool_calls += 1;

                    // Keep user -> assistant -> tool ordering for the providers
                    transcript.push(Message::assistant(format!(
                        "Called tool: {}({})",
                        tool_call.name, tool_call.arguments
                    )));

                    let output = self
                        .tools
                        .dispatch(&tool_call.name, &tool_call.arguments)
                        .await;

                    transcript.push(Message::tool_result(output, tool_call.id));
                }
                LLMResponse::FinalAnswer(answer) => {
                    info!(
                        "SQL agent answered in {:.1}s after {} tool calls",
                        start.elapsed().as_secs_f64(),
                        tool_calls
                    );
                    transcript.push(Message::assistant(answer.content));
                    return Ok(transcript);
                }
            }
        }

        error!(
            "SQL agent exceeded max iterations ({})",
            self.max_iterations
        );
        Err(EngineError::MaxIterationsExceeded)
    }
}
