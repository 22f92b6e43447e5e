//! Shared fixtures for the integration tests
//!
//! - [`KeywordProvider`]: an LLM that answers each pipeline stage by
//!   recognising its prompt
//! - [`ScriptedAgent`]: a query agent with canned answers per sub-query
//! - [`seed_fixture_db`]: a small statistics database on disk

#![allow(dead_code)]

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use courtside_engine::agent::QueryAgent;
use courtside_engine::conductor::Conductor;
use courtside_engine::config::{Config, LLMConfig};
use courtside_engine::llm::{
    router::LLMRouter, FinalAnswer, LLMError, LLMProvider, LLMResponse, Message,
};
use sdk::errors::EngineError;

pub const FIXTURE_SQL: &str = include_str!("../fixtures/stats.sql");

/// Create `stats.db` under `dir` from the fixture script.
pub async fn seed_fixture_db(dir: &Path) -> PathBuf {
    let path = dir.join("stats.db");
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();

    for statement in FIXTURE_SQL.split(';') {
        if statement.trim().is_empty() {
            continue;
        }
        sqlx::query(statement).execute(&pool).await.unwrap();
    }
    pool.close().await;

    path
}

/// Replies and recorded prompts shared with a [`KeywordProvider`]
pub struct Script {
    /// Supervisor reply
    pub route: Mutex<String>,
    /// Planner reply
    pub plan: Mutex<String>,
    /// Team classification reply
    pub teams: Mutex<String>,
    /// Every prompt seen, in order
    pub prompts: Mutex<Vec<String>>,
}

impl Script {
    pub fn new(route: &str, plan: &str) -> Arc<Self> {
        Arc::new(Self {
            route: Mutex::new(route.to_string()),
            plan: Mutex::new(plan.to_string()),
            teams: Mutex::new(r#"{"teams": []}"#.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn set_route(&self, route: &str) {
        *self.route.lock().unwrap() = route.to_string();
    }

    pub fn set_plan(&self, plan: &str) {
        *self.plan.lock().unwrap() = plan.to_string();
    }

    pub fn prompts_containing(&self, needle: &str) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(needle))
            .cloned()
            .collect()
    }

    pub fn planner_prompts(&self) -> Vec<String> {
        self.prompts_containing("Output format:")
    }

    pub fn synthesis_prompts(&self) -> Vec<String> {
        self.prompts_containing("Database results:")
    }
}

/// Answers each stage by recognising a phrase unique to its prompt
pub struct KeywordProvider {
    script: Arc<Script>,
}

impl KeywordProvider {
    pub fn new(script: Arc<Script>) -> Self {
        Self { script }
    }
}

#[async_trait]
impl LLMProvider for KeywordProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn estimated_cost(&self, _tokens: usize) -> f64 {
        0.0
    }

    async fn generate(&self, messages: &[Message]) -> Result<LLMResponse, LLMError> {
        let prompt = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.script.prompts.lock().unwrap().push(prompt.clone());

        let reply = if prompt.contains("decide whether to answer directly") {
            self.script.route.lock().unwrap().clone()
        } else if prompt.contains("Which of these basketball teams") {
            self.script.teams.lock().unwrap().clone()
        } else if prompt.contains("Output format:") {
            self.script.plan.lock().unwrap().clone()
        } else if prompt.contains("Database results:") {
            let results = prompt
                .split("Database results:\n")
                .nth(1)
                .and_then(|rest| rest.split("\n\n").next())
                .unwrap_or_default();
            format!("Scouting summary:\n{}", results)
        } else if prompt.contains("As a UC Davis Basketball analyst, answer") {
            "UC Davis plays in the Big West Conference.".to_string()
        } else if prompt.contains("Rewrite the following answer") {
            format!("FORMATTED: {}", prompt.lines().last().unwrap_or_default())
        } else {
            return Err(LLMError::InvalidRequest(format!(
                "unexpected prompt: {}",
                prompt
            )));
        };

        Ok(LLMResponse::FinalAnswer(FinalAnswer::new(reply)))
    }
}

/// Query agent with canned answers keyed by a substring of the sub-query.
///
/// Each key's answers are used in order; the last one repeats. The answer
/// `"PANIC"` panics inside the agent.
pub struct ScriptedAgent {
    rules: Vec<(String, Vec<String>)>,
    calls: Mutex<Vec<String>>,
    counters: Mutex<HashMap<String, usize>>,
}

impl ScriptedAgent {
    pub fn new(rules: &[(&str, &[&str])]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|(key, answers)| {
                    (
                        key.to_string(),
                        answers.iter().map(|a| a.to_string()).collect(),
                    )
                })
                .collect(),
            calls: Mutex::new(Vec::new()),
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Prompts the agent was invoked with, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryAgent for ScriptedAgent {
    async fn usable_table_names(&self) -> Result<Vec<String>, EngineError> {
        Ok(vec!["PlayerStats".to_string(), "TeamStats".to_string()])
    }

    async fn table_info(&self) -> Result<String, EngineError> {
        Ok("CREATE TABLE PlayerStats (player TEXT, team TEXT, pts_per_game REAL)".to_string())
    }

    async fn invoke(&self, messages: Vec<Message>) -> Result<Vec<Message>, EngineError> {
        let prompt = messages
            .first()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.calls.lock().unwrap().push(prompt.clone());

        let question = prompt.lines().next().unwrap_or_default();
        let answer = match self.rules.iter().find(|(key, _)| question.contains(key.as_str())) {
            Some((key, answers)) => {
                let mut counters = self.counters.lock().unwrap();
                let index = counters.entry(key.clone()).or_insert(0);
                let answer = answers[(*index).min(answers.len() - 1)].clone();
                *index += 1;
                answer
            }
            None => "Error: no canned answer".to_string(),
        };

        if answer == "PANIC" {
            panic!("agent blew up on {:?}", question);
        }

        let mut transcript = messages;
        transcript.push(Message::assistant(answer));
        Ok(transcript)
    }
}

/// Configuration with defaults, no format pass, and a short attempt timeout
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.llm.default_provider = "ollama".to_string();
    config.assistant.sub_query_timeout_secs = 5;
    config.assistant.format_answers = false;
    config
}

/// Wire a conductor around a keyword provider and a query agent
pub fn conductor(config: &Config, script: Arc<Script>, agent: Arc<dyn QueryAgent>) -> Conductor {
    let router = LLMRouter::new(
        vec![Box::new(KeywordProvider::new(script))],
        Arc::new(LLMConfig {
            default_provider: "ollama".to_string(),
            ..config.llm.clone()
        }),
    );
    Conductor::new(config, Arc::new(router), agent).unwrap()
}

pub fn plan_json(questions: &[&str]) -> String {
    serde_json::json!({ "questions": questions }).to_string()
}
