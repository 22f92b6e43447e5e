//! Query Executor
//!
//! Runs each sub-query through the [`QueryAgent`] with bounded retry:
//!
//! `Planned -> Executing -> {Succeeded, Retrying, Failed}`, where `Retrying`
//! goes back to `Executing` until the agent succeeds or `max_retries` failed
//! attempts have been recorded.
//!
//! An attempt fails when the agent errors, times out, returns no answer, or
//! its answer carries a failure signature. The next attempt's prompt quotes
//! the previous error verbatim. Errors that are not recoverable, such as a
//! refused write, end the sub-query at once.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::types::{RetryState, SubQuery, SubQueryOutcome, SubQueryStatus};
use crate::agent::{last_assistant_message, QueryAgent};
use crate::llm::Message;
use sdk::errors::{EngineError, EngineErrorExt};

/// Substrings (lowercase) that mark an agent answer as failed
const FAILURE_SIGNATURES: &[&str] = &["error", "unknown column"];

/// True when the agent's answer text reports a failure
pub fn has_failure_signature(text: &str) -> bool {
    let lower = text.to_lowercase();
    FAILURE_SIGNATURES.iter().any(|sig| lower.contains(sig))
}

enum AttemptError {
    /// Worth another attempt with the error in the prompt
    Retryable(String),
    /// Stop immediately
    Fatal(String),
}

/// Executes sub-queries one at a time
pub struct Executor {
    agent: Arc<dyn QueryAgent>,
    max_retries: u32,
    attempt_timeout: Duration,
}

impl Executor {
    pub fn new(agent: Arc<dyn QueryAgent>, max_retries: u32, attempt_timeout: Duration) -> Self {
        Self {
            agent,
            max_retries,
            attempt_timeout,
        }
    }

    /// Execute sub-queries in plan order. One failure never stops the rest.
    pub async fn execute_all(&self, sub_queries: &[SubQuery]) -> Vec<SubQueryOutcome> {
        let mut outcomes = Vec::with_capacity(sub_queries.len());
        for sub_query in sub_queries {
            outcomes.push(self.execute(sub_query.clone()).await);
        }
        outcomes
    }

    /// Execute one sub-query to a terminal state.
    pub async fn execute(&self, sub_query: SubQuery) -> SubQueryOutcome {
        let start = Instant::now();
        let mut retry = RetryState::default();
        let mut status = SubQueryStatus::Planned;
        debug!(sub_query = %sub_query, ?status, "Sub-query queued");

        loop {
            status = SubQueryStatus::Executing;
            debug!(
                sub_query = %sub_query,
                ?status,
                attempt = retry.retry_count + 1,
                "Running sub-query"
            );

            match self.attempt(&sub_query, &retry).await {
                Ok(answer) => {
                    info!(
                        sub_query = %sub_query,
                        retries = retry.retry_count,
                        "Sub-query succeeded in {:.1}s",
                        start.elapsed().as_secs_f64()
                    );
                    return SubQueryOutcome::succeeded(sub_query, retry, answer);
                }
                Err(AttemptError::Fatal(error)) => {
                    warn!(sub_query = %sub_query, "Sub-query stopped: {}", error);
                    retry = retry.record_failure(error);
                    break;
                }
                Err(AttemptError::Retryable(error)) => {
                    retry = retry.record_failure(error);
                    if retry.is_exhausted(self.max_retries) {
                        break;
                    }
                    status = SubQueryStatus::Retrying;
                    warn!(
                        sub_query = %sub_query,
                        ?status,
                        retry_count = retry.retry_count,
                        max_retries = self.max_retries,
                        "Sub-query attempt failed: {}",
                        retry.last_error.as_deref().unwrap_or_default()
                    );
                }
            }
        }

        warn!(
            sub_query = %sub_query,
            retry_count = retry.retry_count,
            "Sub-query abandoned"
        );
        SubQueryOutcome::failed(sub_query, retry)
    }

    async fn attempt(&self, sub_query: &SubQuery, retry: &RetryState) -> Result<String, AttemptError> {
        let prompt = match &retry.last_error {
            None => sub_query.to_string(),
            Some(error) => format!(
                "{}\n\nA previous attempt to answer this failed with the following error:\n{}\n\n\
                 Please try an alternative formulation of the query.",
                sub_query, error
            ),
        };

        let result =
            tokio::time::timeout(self.attempt_timeout, self.agent.invoke(vec![Message::user(prompt)]))
                .await;

        let transcript = match result {
            Err(_) => {
                return Err(AttemptError::Retryable(format!(
                    "Timed out after {:?}",
                    self.attempt_timeout
                )));
            }
            Ok(Err(e)) if !e.is_recoverable() => return Err(AttemptError::Fatal(e.to_string())),
            Ok(Err(e)) => return Err(AttemptError::Retryable(e.to_string())),
            Ok(Ok(transcript)) => transcript,
        };

        match last_assistant_message(&transcript) {
            None => Err(AttemptError::Retryable(
                "Agent returned no answer".to_string(),
            )),
            Some(answer) if has_failure_signature(answer) => {
                Err(AttemptError::Retryable(answer.to_string()))
            }
            Some(answer) => Ok(answer.to_string()),
        }
    }
}
