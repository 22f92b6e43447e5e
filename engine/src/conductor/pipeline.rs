//! Chat pipeline
//!
//! One request, one sequential pass:
//!
//! 1. Render thread memory
//! 2. Supervisor picks a route
//! 3. `direct_answer`: synthesizer answers from the model
//!    `db_query`: planner -> executor (one sub-query at a time) -> synthesizer
//!    `end`: fixed closing message
//! 4. Record the turn in thread memory
//!
//! Stage failures become a degraded response with `path = "error"`; this
//! function never returns an error.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, warn, Instrument};

use super::executor::Executor;
use super::memory::{Actor, MemoryStore};
use super::planner::Planner;
use super::resolver::TeamResolver;
use super::supervisor::Supervisor;
use super::synthesizer::{Synthesizer, FALLBACK_APOLOGY};
use super::types::{ConversationState, Route};
use crate::agent::QueryAgent;
use crate::config::Config;
use crate::llm::router::LLMRouter;
use sdk::errors::{EngineError, EngineErrorExt};
use sdk::{ChatRequest, ChatResponse, QueryMetadata, ResponsePath, ResponseStatus};

/// Reply for the `end` route
pub const CLOSING_MESSAGE: &str =
    "Thanks for talking UC Davis basketball. Come back any time you need more stats!";

/// Reply when a stage fails outright
pub const UNEXPECTED_ERROR: &str =
    "I apologize, but I encountered an unexpected error while processing your request.";

/// Error-list entry when the planner produced nothing
pub const NOTHING_PLANNED: &str = "No database queries could be planned for this question";

/// Top-level orchestrator for chat turns
pub struct Conductor {
    memory: Arc<MemoryStore>,
    memory_window: usize,
    resolver: TeamResolver,
    supervisor: Supervisor,
    planner: Planner,
    executor: Executor,
    synthesizer: Synthesizer,
    agent: Arc<dyn QueryAgent>,
    router: Arc<LLMRouter>,
}

impl Conductor {
    /// Wire every stage from the assistant settings.
    pub fn new(
        config: &Config,
        router: Arc<LLMRouter>,
        agent: Arc<dyn QueryAgent>,
    ) -> Result<Self, EngineError> {
        let assistant = &config.assistant;
        Ok(Self {
            memory: Arc::new(MemoryStore::new(assistant.max_threads)),
            memory_window: assistant.memory_window,
            resolver: TeamResolver::new(assistant, Some(Arc::clone(&router)))?,
            supervisor: Supervisor::new(Arc::clone(&router)),
            planner: Planner::new(
                Arc::clone(&router),
                assistant.teams.clone(),
                assistant.max_sub_queries,
            )?,
            executor: Executor::new(
                Arc::clone(&agent),
                assistant.max_retries,
                Duration::from_secs(assistant.sub_query_timeout_secs),
            ),
            synthesizer: Synthesizer::new(Arc::clone(&router), assistant.format_answers),
            agent,
            router,
        })
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    pub fn agent(&self) -> &Arc<dyn QueryAgent> {
        &self.agent
    }

    pub fn router(&self) -> &Arc<LLMRouter> {
        &self.router
    }

    /// Run one chat turn.
    ///
    /// A missing or blank `thread_id` starts a new thread.
    pub async fn handle(&self, request: ChatRequest) -> ChatResponse {
        let thread_id = request
            .thread_id
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let span = info_span!("chat", thread_id = %thread_id);
        self.run(thread_id, request.message).instrument(span).await
    }

    async fn run(&self, thread_id: String, question: String) -> ChatResponse {
        let start = Instant::now();
        info!(question = %question, "Chat turn started");

        let memory = self.memory.context(&thread_id, self.memory_window).await;
        let mut state = ConversationState::new(question, memory);

        let response = match self.answer(&mut state, &thread_id).await {
            Ok(response) => response,
            Err(e) => {
                error!("Chat turn failed: {}", e);
                state.path = ResponsePath::Error;
                let mut response =
                    ChatResponse::new(UNEXPECTED_ERROR, thread_id.as_str(), ResponsePath::Error);
                response.status = Some(ResponseStatus::Error);
                response.error = Some(e.user_hint().to_string());
                response
            }
        };

        self.memory
            .append(&thread_id, Actor::Human, state.question.as_str())
            .await;
        let failed = response.path == ResponsePath::Error
            || response.status == Some(ResponseStatus::Error);
        if !failed {
            self.memory
                .append(&thread_id, Actor::Assistant, response.response.as_str())
                .await;
        }

        info!(
            path = response.path.as_str(),
            "Chat turn finished in {:.1}s",
            start.elapsed().as_secs_f64()
        );
        response
    }

    async fn answer(
        &self,
        state: &mut ConversationState,
        thread_id: &str,
    ) -> Result<ChatResponse, EngineError> {
        let route = self.supervisor.route(&state.question, &state.memory).await?;

        match route {
            Route::End => {
                state.path = ResponsePath::End;
                Ok(ChatResponse::new(CLOSING_MESSAGE, thread_id, ResponsePath::End))
            }
            Route::DirectAnswer => {
                state.path = ResponsePath::Direct;
                let teams = self.resolver.resolve(&state.question).await;
                let answer = self
                    .synthesizer
                    .direct_answer(&state.question, &state.memory)
                    .await?;

                let mut response = ChatResponse::new(answer, thread_id, ResponsePath::Direct);
                response.relevant_teams = Some(teams);
                Ok(response)
            }
            Route::DbQuery => {
                state.path = ResponsePath::DbQuery;
                self.answer_from_database(state, thread_id).await
            }
        }
    }

    async fn answer_from_database(
        &self,
        state: &mut ConversationState,
        thread_id: &str,
    ) -> Result<ChatResponse, EngineError> {
        let teams = self.resolver.resolve(&state.question).await;

        let table_info = match self.agent.table_info().await {
            Ok(info) => info,
            Err(e) => {
                warn!("Could not load table info for planning: {}", e);
                String::new()
            }
        };

        let sub_queries = self
            .planner
            .plan(&state.question, &state.memory, &table_info)
            .await;
        info!(?sub_queries, "Query questions to execute");

        let outcomes = self.executor.execute_all(&sub_queries).await;
        state.record(&outcomes);
        if sub_queries.is_empty() {
            state.errors.push(NOTHING_PLANNED.to_string());
        }

        let metadata = QueryMetadata {
            queries_executed: sub_queries.len(),
            successful_queries: state.relevant_stats.len(),
            failed_queries: outcomes.iter().filter(|o| !o.is_success()).count(),
        };

        let mut response = if state.relevant_stats.is_empty() {
            warn!(errors = ?state.errors, "All queries failed");
            let mut response = ChatResponse::new(FALLBACK_APOLOGY, thread_id, ResponsePath::DbQuery);
            response.status = Some(ResponseStatus::Error);
            response.errors = Some(state.errors.clone());
            response
        } else {
            let answer = self
                .synthesizer
                .synthesize(&state.question, &state.relevant_stats, &state.memory)
                .await?;
            let mut response = ChatResponse::new(answer, thread_id, ResponsePath::DbQuery);
            response.status = Some(ResponseStatus::Success);
            if !state.errors.is_empty() {
                response.errors = Some(state.errors.clone());
            }
            response
        };

        response.relevant_teams = Some(teams);
        response.metadata = Some(metadata);
        Ok(response)
    }
}
