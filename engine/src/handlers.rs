//! Command handlers for CLI operations
//!
//! - serve: Run the HTTP API
//! - ask: Answer one question and print the response
//! - tables: List the queryable tables
//! - doctor: Validate configuration and check dependencies

use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;

use crate::agent::{QueryAgent, SqlAgent};
use crate::conductor::Conductor;
use crate::config::Config;
use crate::db::Database;
use crate::llm::router::LLMRouter;
use crate::tools::ToolRegistry;
use sdk::{ChatRequest, ResponsePath};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Open the database and wire every pipeline stage.
pub async fn build_conductor(config: &Config) -> Result<Arc<Conductor>> {
    let database = Database::open(&config.database)
        .await
        .context("Failed to open statistics database")?;

    let router = Arc::new(LLMRouter::from_config(Arc::new(config.llm.clone())));
    tracing::info!(providers = ?router.provider_names(), "LLM router ready");

    let agent: Arc<dyn QueryAgent> = Arc::new(SqlAgent::new(
        Arc::clone(&router),
        ToolRegistry::new(database),
        config.database.top_k,
        config.assistant.max_agent_iterations,
    ));

    let conductor = Conductor::new(config, router, agent)
        .context("Failed to build the chat pipeline")?;
    Ok(Arc::new(conductor))
}

/// Run the HTTP API until Ctrl+C
pub async fn handle_serve(config: &Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut server = config.server.clone();
    if let Some(host) = host {
        server.host = host;
    }
    if let Some(port) = port {
        server.port = port;
    }

    let conductor = build_conductor(config).await?;
    crate::api::serve(&server, conductor).await?;
    Ok(())
}

/// Answer one question
pub async fn handle_ask(
    question: String,
    thread: Option<String>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    if question.trim().is_empty() {
        anyhow::bail!("Question must not be empty");
    }

    let conductor = build_conductor(config).await?;
    let mut request = ChatRequest::new(question);
    request.thread_id = thread;

    let response = conductor.handle(request).await;

    match format {
        OutputFormat::Text => {
            println!("{}", response.response);
            println!();
            if let Some([primary, comparison]) = &response.relevant_teams {
                println!("  Teams:   {} vs {}", primary, comparison);
            }
            if let Some(metadata) = &response.metadata {
                println!(
                    "  Queries: {} run, {} succeeded, {} failed",
                    metadata.queries_executed,
                    metadata.successful_queries,
                    metadata.failed_queries
                );
            }
            for error in response.errors.iter().flatten() {
                println!("  ! {}", error);
            }
            if let Some(error) = &response.error {
                println!("  ! {}", error);
            }
            println!("  Path:    {}", response.path.as_str());
            println!("  Thread:  {}", response.thread_id);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    if response.path == ResponsePath::Error {
        anyhow::bail!("Question could not be answered");
    }
    Ok(())
}

/// List the tables the assistant can query, with their schema
pub async fn handle_tables(config: &Config, format: OutputFormat) -> Result<()> {
    let database = Database::open(&config.database)
        .await
        .context("Failed to open statistics database")?;
    let tables = database.usable_table_names().await?;
    let schema = database.table_info(None).await?;
    database.close().await;

    match format {
        OutputFormat::Text => {
            if tables.is_empty() {
                println!("No tables found in {:?}", config.database.path);
                return Ok(());
            }
            println!("Tables: {}", tables.join(", "));
            println!();
            println!("{}", schema);
        }
        OutputFormat::Json => {
            let output = json!({ "tables": tables, "schema": schema });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Validate configuration and check dependencies
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(String, String)> = Vec::new();

    // Config is already validated when loaded
    checks.push(("Configuration".into(), "Valid".into()));

    if config.database.path.exists() {
        checks.push(("Database".into(), "Exists".into()));
        match Database::open(&config.database).await {
            Ok(database) => {
                match database.usable_table_names().await {
                    Ok(tables) if tables.is_empty() => {
                        checks.push(("Tables".into(), "None".into()));
                        issues.push("Database contains no tables".to_string());
                    }
                    Ok(tables) => checks.push(("Tables".into(), tables.len().to_string())),
                    Err(e) => {
                        checks.push(("Tables".into(), "Error".into()));
                        issues.push(format!("Cannot list tables: {}", e));
                    }
                }
                database.close().await;
            }
            Err(e) => {
                checks.push(("Database connection".into(), "Failed".into()));
                issues.push(format!("Cannot open database: {}", e));
            }
        }
    } else {
        checks.push(("Database".into(), "Missing".into()));
        issues.push(format!(
            "Statistics database not found: {:?}",
            config.database.path
        ));
    }

    if std::env::var(&config.llm.openai.api_key_env).is_ok() {
        checks.push(("OpenAI API key".into(), "Configured".into()));
    } else {
        checks.push(("OpenAI API key".into(), "Not configured".into()));
    }

    let router = LLMRouter::from_config(Arc::new(config.llm.clone()));
    let health = router.check_health().await;
    for (name, healthy) in &health {
        let status = if *healthy { "Available" } else { "Not available" };
        checks.push((format!("Provider {}", name), status.into()));
    }
    if !health.iter().any(|(_, healthy)| *healthy) {
        issues.push("No LLM providers available. Configure at least one provider.".to_string());
    }

    match format {
        OutputFormat::Text => {
            println!("Courtside System Diagnostics");
            println!("============================");
            println!();

            println!("System Checks:");
            for (check, status) in &checks {
                println!("  {:<25} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
