//! Answer Synthesizer
//!
//! Writes the final answer. Database answers only ever see the results of
//! succeeded sub-queries; with none, the fixed apology is returned without a
//! model call.

use std::sync::Arc;
use tracing::{info, warn};

use crate::llm::router::LLMRouter;
use crate::llm::Message;
use sdk::errors::EngineError;

/// Returned when every sub-query failed
pub const FALLBACK_APOLOGY: &str =
    "I encountered issues while querying the database. Please try rephrasing your question.";

pub struct Synthesizer {
    router: Arc<LLMRouter>,
    format_answers: bool,
}

impl Synthesizer {
    pub fn new(router: Arc<LLMRouter>, format_answers: bool) -> Self {
        Self {
            router,
            format_answers,
        }
    }

    /// Answer from retrieved results.
    pub async fn synthesize(
        &self,
        question: &str,
        results: &[String],
        memory: &str,
    ) -> Result<String, EngineError> {
        if results.is_empty() {
            return Ok(FALLBACK_APOLOGY.to_string());
        }

        let numbered = results
            .iter()
            .enumerate()
            .map(|(i, r)| format!("{}. {}", i + 1, r))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "You are a UC Davis Basketball analyst and scout. Given the following question and the \
             results of the database queries, generate a detailed and actionable insight that answers \
             the user's question.\n\n\
             Conversation so far:\n{}\n\n\
             Question: {}\n\
             Database results:\n{}\n\n\
             Output your answer in a clear and concise manner. Only use stats that appear in the \
             database results above and are relevant to the question; never invent numbers.",
            if memory.is_empty() { "(none)" } else { memory },
            question,
            numbered
        );

        let answer = self
            .router
            .invoke_text(&[Message::user(prompt)])
            .await
            .map_err(|e| EngineError::Synthesis(e.to_string()))?;
        info!(results = results.len(), "Generated answer from database results");

        Ok(self.format(answer).await)
    }

    /// Answer without touching the database.
    pub async fn direct_answer(&self, question: &str, memory: &str) -> Result<String, EngineError> {
        let prompt = format!(
            "As a UC Davis Basketball analyst, answer the following question.\n\n\
             Conversation so far:\n{}\n\n\
             Question: {}",
            if memory.is_empty() { "(none)" } else { memory },
            question
        );

        let answer = self
            .router
            .invoke_text(&[Message::user(prompt)])
            .await
            .map_err(|e| EngineError::Synthesis(e.to_string()))?;
        info!("Generated direct answer");

        Ok(self.format(answer).await)
    }

    /// Presentation-only rewrite. Keeps the original text if the pass fails.
    async fn format(&self, answer: String) -> String {
        if !self.format_answers {
            return answer;
        }

        let prompt = format!(
            "Rewrite the following answer for readability using short paragraphs or bullet points. \
             Do not add, remove, or change any facts, names, or numbers.\n\n{}",
            answer
        );

        match self.router.invoke_text(&[Message::user(prompt)]).await {
            Ok(formatted) if !formatted.trim().is_empty() => formatted,
            Ok(_) => answer,
            Err(e) => {
                warn!("Format pass failed, keeping unformatted answer: {}", e);
                answer
            }
        }
    }
}
