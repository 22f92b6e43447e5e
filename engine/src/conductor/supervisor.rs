//! Supervisor
//!
//! Asks the model which branch a question needs and reduces the free-text
//! reply to a [`Route`]. All string matching on model output for routing lives
//! in [`classify_route`].

use std::sync::Arc;
use tracing::info;

use super::types::Route;
use crate::llm::router::LLMRouter;
use crate::llm::Message;
use sdk::errors::EngineError;

/// Reduce a classification reply to a route.
///
/// Case-insensitive substring match. `db_query` is checked before `__end__`;
/// anything else is a direct answer.
pub fn classify_route(reply: &str) -> Route {
    let reply = reply.to_lowercase();
    if reply.contains("db_query") {
        Route::DbQuery
    } else if reply.contains("__end__") {
        Route::End
    } else {
        Route::DirectAnswer
    }
}

pub struct Supervisor {
    router: Arc<LLMRouter>,
}

impl Supervisor {
    pub fn new(router: Arc<LLMRouter>) -> Self {
        Self { router }
    }

    /// Decide the branch for a question. A failed model call is returned as-is.
    pub async fn route(&self, question: &str, memory: &str) -> Result<Route, EngineError> {
        let prompt = format!(
            "You are a UC Davis Basketball analyst and scout. Based on the following question, \
             decide whether to answer directly or to query the database for stats.\n\n\
             Conversation so far:\n{}\n\n\
             Question: {}\n\
             If the question is about a comparison, stats, or trends, output \"db_query\". \
             Otherwise, output \"direct_answer\". If no further action is needed, output \"__end__\".",
            if memory.is_empty() { "(none)" } else { memory },
            question
        );

        let reply = self.router.invoke_text(&[Message::user(prompt)]).await?;
        let route = classify_route(&reply);
        info!(route = %route, "Supervisor decided next step");
        Ok(route)
    }
}
