//! LLM Router
//!
//! Orders the configured providers and calls them with failover. The configured
//! default provider is always tried first; the rest follow cheapest first. Each
//! attempt is bounded by `llm.request_timeout_secs`.
//!
//! Pipeline stages never talk to a provider directly. They go through
//! [`LLMRouter::invoke_text`] for free text or [`LLMRouter::invoke_structured`]
//! when they expect a JSON object back.

use super::ollama::OllamaProvider;
use super::openai::OpenAIProvider;
use super::{LLMProvider, LLMResponse, Message};
use crate::config::LLMConfig;
use sdk::errors::EngineError;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// LLM Router that selects providers and fails over between them
pub struct LLMRouter {
    /// Available LLM providers
    providers: Vec<Box<dyn LLMProvider>>,

    /// LLM configuration
    config: Arc<LLMConfig>,
}

impl LLMRouter {
    /// Create a new LLM router
    pub fn new(providers: Vec<Box<dyn LLMProvider>>, config: Arc<LLMConfig>) -> Self {
        Self { providers, config }
    }

    /// Build a router with every provider the config knows about.
    ///
    /// OpenAI is only registered when its API key variable is set, so a
    /// local-only setup does not burn a failed attempt on every call.
    pub fn from_config(config: Arc<LLMConfig>) -> Self {
        let mut providers: Vec<Box<dyn LLMProvider>> = Vec::new();

        if std::env::var(&config.openai.api_key_env).is_ok() {
            providers.push(Box::new(OpenAIProvider::new(config.openai.clone())));
        } else {
            tracing::info!(
                "{} not set; OpenAI provider disabled",
                config.openai.api_key_env
            );
        }
        providers.push(Box::new(OllamaProvider::from_config(&config.ollama)));

        Self::new(providers, config)
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Estimate token count for the conversation
    ///
    /// Uses a simple heuristic: ~4 characters per token
    fn estimate_tokens(&self, messages: &[Message]) -> usize {
        let total_chars: usize = messages.iter().map(|m| m.content.len()).sum();
        total_chars / 4
    }

    /// Rank providers: configured default first, then by estimated cost.
    pub fn rank_providers(&self, estimated_tokens: usize) -> Vec<&dyn LLMProvider> {
        let mut providers: Vec<&dyn LLMProvider> =
            self.providers.iter().map(|b| b.as_ref()).collect();

        let default_provider = &self.config.default_provider;

        providers.sort_by(|a, b| {
            let a_default = a.name() == default_provider;
            let b_default = b.name() == default_provider;

            b_default.cmp(&a_default).then_with(|| {
                a.estimated_cost(estimated_tokens)
                    .partial_cmp(&b.estimated_cost(estimated_tokens))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        });

        providers
    }

    /// Call LLM providers with automatic failover
    ///
    /// Attempts providers in ranked order, each under the configured timeout.
    /// Returns the response together with the name of the provider that
    /// produced it, or `AllProvidersExhausted` once every provider failed.
    pub async fn call(&self, messages: &[Message]) -> Result<(LLMResponse, String), EngineError> {
        if self.providers.is_empty() {
            return Err(EngineError::Config(
                "No LLM providers configured".to_string(),
            ));
        }

        let timeout_secs = self.config.request_timeout_secs;
        let ranked_providers = self.rank_providers(self.estimate_tokens(messages));

        for provider in ranked_providers {
            tracing::debug!(
                "Attempting provider: {} (timeout: {}s)",
                provider.name(),
                timeout_secs
            );

            let result = tokio::time::timeout(
                Duration::from_secs(timeout_secs),
                provider.generate(messages),
            )
            .await;

            match result {
                Ok(Ok(response)) => {
                    tracing::debug!("Provider {} succeeded", provider.name());
                    return Ok((response, provider.name().to_string()));
                }
                Ok(Err(e)) => {
                    tracing::warn!("Provider {} failed: {}", provider.name(), e);
                }
                Err(_) => {
                    tracing::warn!(
                        "Provider {} timed out after {}s",
                        provider.name(),
                        timeout_secs
                    );
                }
            }
        }

        tracing::error!("All LLM providers exhausted");
        Err(EngineError::AllProvidersExhausted)
    }

    /// Invoke the model and return its reply as plain text.
    pub async fn invoke_text(&self, messages: &[Message]) -> Result<String, EngineError> {
        let (response, _) = self.call(messages).await?;
        Ok(response.into_text())
    }

    /// Invoke the model and decode a JSON object from its reply.
    ///
    /// The object may be bare, fenced, or embedded in prose. A reply that
    /// carries no object matching `T` is an `LLMProvider` error.
    pub async fn invoke_structured<T: DeserializeOwned>(
        &self,
        messages: &[Message],
    ) -> Result<T, EngineError> {
        let text = self.invoke_text(messages).await?;
        parse_structured(&text)
    }

    /// Check the health of all registered providers
    /// Returns a list of (provider_name, is_healthy)
    pub async fn check_health(&self) -> Vec<(&str, bool)> {
        let mut results = Vec::new();
        for provider in &self.providers {
            let is_healthy = provider.check_health().await;
            results.push((provider.name(), is_healthy));
        }
        results
    }
}

fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, EngineError> {
    let value = super::extract_json_object(text).ok_or_else(|| {
        EngineError::LLMProvider("Model reply did not contain a JSON object".to_string())
    })?;
    serde_json::from_value(value)
        .map_err(|e| EngineError::LLMProvider(format!("Unexpected structured output: {}", e)))
}
