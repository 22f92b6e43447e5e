use async_trait::async_trait;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use courtside_engine::agent::QueryAgent;
use courtside_engine::conductor::{
    classify_route, Actor, ConversationMemory, Executor, RetryState, Route, SubQuery,
    SubQueryStatus, TeamResolver,
};
use courtside_engine::config::{AssistantConfig, Config, CONFERENCE_AVERAGE};
use courtside_engine::db::SqlGuard;
use courtside_engine::llm::Message;
use sdk::errors::EngineError;

// Windowed context is exactly the last W entries, oldest first
proptest! {
    #[test]
    fn test_memory_window(
        texts in prop::collection::vec("[a-zA-Z0-9 ?.]{1,40}", 1..30),
        window in 1..15usize,
    ) {
        let mut memory = ConversationMemory::new();
        for (i, text) in texts.iter().enumerate() {
            let actor = if i % 2 == 0 { Actor::Human } else { Actor::Assistant };
            memory.append(actor, text.clone());
        }

        let rendered = memory.context(window);
        let lines: Vec<&str> = rendered.lines().collect();
        let expected = texts.len().min(window);
        prop_assert_eq!(lines.len(), expected);

        let skip = texts.len() - expected;
        for (offset, line) in lines.iter().enumerate() {
            let i = skip + offset;
            let actor = if i % 2 == 0 { "HUMAN" } else { "ASSISTANT" };
            prop_assert_eq!(*line, format!("{}: {}", actor, texts[i]));
        }

        // Reading does not change anything
        prop_assert_eq!(memory.context(window), rendered);
        prop_assert_eq!(memory.len(), texts.len());
    }
}

// Route classification is total and prefers db_query over __end__
proptest! {
    #[test]
    fn test_classify_route(prefix in "[a-z ]{0,20}", suffix in "[a-z ]{0,20}") {
        let plain = format!("{}{}", prefix, suffix);
        prop_assume!(!plain.contains("db_query") && !plain.contains("__end__"));

        prop_assert_eq!(classify_route(&plain), Route::DirectAnswer);
        prop_assert_eq!(
            classify_route(&format!("{}db_query{}", prefix, suffix)),
            Route::DbQuery
        );
        prop_assert_eq!(
            classify_route(&format!("{}__end__{}", prefix, suffix)),
            Route::End
        );
        prop_assert_eq!(
            classify_route(&format!("__end__ {} db_query", prefix)),
            Route::DbQuery
        );
    }
}

// A single named team is always paired with the conference average
proptest! {
    #[test]
    fn test_resolver_single_team(team_idx in 0..11usize, day in 1..31u32) {
        let config = AssistantConfig::default();
        let resolver = TeamResolver::new(&config, None).unwrap();
        let team = &config.teams[team_idx % config.teams.len()];

        let question = format!("How is {} doing since day {}?", team, day);
        let named = resolver.named_entities(&question);
        prop_assert_eq!(named.clone(), vec![team.clone()]);
        prop_assert_eq!(
            resolver.pair(&named),
            [team.clone(), CONFERENCE_AVERAGE.to_string()]
        );

        prop_assert_eq!(
            resolver.pair(&[]),
            [config.home_team.clone(), CONFERENCE_AVERAGE.to_string()]
        );
    }
}

// Retry count only grows and exhausts exactly at the bound
proptest! {
    #[test]
    fn test_retry_state_bound(max_retries in 1..8u32, failures in 0..12u32) {
        let mut state = RetryState::default();
        for i in 0..failures {
            state = state.record_failure(format!("attempt {} failed", i));
        }
        prop_assert_eq!(state.retry_count, failures);
        prop_assert_eq!(state.is_exhausted(max_retries), failures >= max_retries);
        if failures > 0 {
            let expected = format!("attempt {} failed", failures - 1);
            prop_assert_eq!(state.last_error.as_deref(), Some(expected.as_str()));
        }
    }
}

/// Fails every attempt with a failure signature
struct AlwaysFailing;

#[async_trait]
impl QueryAgent for AlwaysFailing {
    async fn usable_table_names(&self) -> Result<Vec<String>, EngineError> {
        Ok(vec![])
    }

    async fn table_info(&self) -> Result<String, EngineError> {
        Ok(String::new())
    }

    async fn invoke(&self, mut messages: Vec<Message>) -> Result<Vec<Message>, EngineError> {
        messages.push(Message::assistant("Unknown column 'ppg'"));
        Ok(messages)
    }
}

// Executed sub-queries never exceed the retry bound
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]
    #[test]
    fn test_executor_respects_max_retries(max_retries in 1..6u32, question in "[A-Za-z ]{1,30}") {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let executor = Executor::new(Arc::new(AlwaysFailing), max_retries, Duration::from_secs(5));

        let outcome = runtime.block_on(executor.execute(SubQuery::new(question)));
        prop_assert_eq!(outcome.status, SubQueryStatus::Failed);
        prop_assert_eq!(outcome.retry.retry_count, max_retries);
        prop_assert!(outcome.result.is_none());
    }
}

// Forbidden words inside string literals never trip the guard
proptest! {
    #[test]
    fn test_guard_ignores_literals(
        word in "DELETE|DROP|UPDATE|INSERT|ALTER|PRAGMA",
        note in "[a-z ]{0,10}",
    ) {
        let sql = format!(
            "SELECT player FROM PlayerStats WHERE note = '{} {}'",
            word, note
        );
        prop_assert!(SqlGuard::validate(&sql).is_ok());

        let write = format!("{} FROM PlayerStats", word);
        prop_assert!(SqlGuard::validate(&write).is_err());
    }
}

// Assistant settings survive a TOML round-trip
proptest! {
    #[test]
    fn test_config_round_trip(
        log_level in "error|warn|info|debug|trace",
        provider in "openai|ollama",
        memory_window in 1..50usize,
        max_retries in 1..10u32,
        port in 1024..65535u16,
    ) {
        let mut config = Config::default();
        config.core.log_level = log_level;
        config.llm.default_provider = provider;
        config.assistant.memory_window = memory_window;
        config.assistant.max_retries = max_retries;
        config.server.port = port;

        let toml_string = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_string).unwrap();

        prop_assert_eq!(&parsed.core.log_level, &config.core.log_level);
        prop_assert_eq!(&parsed.llm.default_provider, &config.llm.default_provider);
        prop_assert_eq!(parsed.assistant.memory_window, memory_window);
        prop_assert_eq!(parsed.assistant.max_retries, max_retries);
        prop_assert_eq!(parsed.server.port, port);
        prop_assert!(parsed.validate().is_ok());
    }
}
