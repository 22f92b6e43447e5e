//! SQL tools exposed to the query agent
//!
//! The agent sees three tools: list the tables, describe some tables, and run a
//! read-only query. Failures come back as `Error: ...` text so the model can
//! read them and correct itself on the next iteration.

use tracing::{debug, warn};

use crate::db::Database;
use sdk::errors::EngineError;

pub const LIST_TABLES: &str = "sql_db_list_tables";
pub const SCHEMA: &str = "sql_db_schema";
pub const QUERY: &str = "sql_db_query";

/// Registry of the SQL tools available to the agent
pub struct ToolRegistry {
    db: Database,
}

impl ToolRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Names the agent may call
    pub fn available_tool_names(&self) -> Vec<&'static str> {
        vec![LIST_TABLES, SCHEMA, QUERY]
    }

    /// Dispatch a tool call by name, parsing arguments from JSON.
    ///
    /// Always returns text for the model. Errors are rendered, never raised.
    pub async fn dispatch(&self, name: &str, arguments_json: &str) -> String {
        debug!("Dispatching tool '{}' with args: {}", name, arguments_json);

        let args: serde_json::Value = if arguments_json.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            match serde_json::from_str(arguments_json) {
                Ok(v) => v,
                Err(e) => {
                    return format!("Error: Failed to parse arguments JSON: {}", e);
                }
            }
        };

        match name {
            LIST_TABLES => match self.db.usable_table_names().await {
                Ok(names) => names.join(", "),
                Err(e) => format!("Error: {}", e),
            },
            SCHEMA => {
                let tables = table_names_arg(&args);
                if tables.is_empty() {
                    return format!(
                        "Error: {} needs a comma-separated \"table_names\" argument",
                        SCHEMA
                    );
                }
                match self.db.table_info(Some(&tables)).await {
                    Ok(info) => info,
                    Err(e) => format!("Error: {}", e),
                }
            }
            QUERY => {
                let query = args
                    .get("query")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                match self.db.run_query(query).await {
                    Ok(rows) => rows,
                    Err(EngineError::WriteQueryNotAllowed(reason)) => {
                        warn!("Refused non read-only query: {}", reason);
                        format!(
                            "Error: query refused ({}). Only a single read-only SELECT is permitted.",
                            reason
                        )
                    }
                    Err(e) => format!("Error: {}", e),
                }
            }
            _ => {
                warn!("Unknown tool requested: {}", name);
                format!(
                    "Error: Unknown tool '{}'. Available tools: {}",
                    name,
                    self.available_tool_names().join(", ")
                )
            }
        }
    }

    /// System prompt describing the SQL tools and the rules of engagement.
    pub fn system_prompt(&self, top_k: usize) -> String {
        let parts = [
            "You are an agent designed to interact with a SQL database of basketball statistics.".to_string(),
            format!(
                "Given an input question, create a syntactically correct SQLite query to run, then look at the results of the query and return the answer. Unless the user specifies a specific number of examples they wish to obtain, always limit your query to at most {} results.",
                top_k
            ),
            "You can order the results by a relevant column to return the most interesting examples in the database. Never query for all the columns from a specific table, only ask for the relevant columns given the question.".to_string(),
            "You MUST double check your query before executing it. If you get an error while executing a query, rewrite the query and try again.".to_string(),
            "DO NOT make any DML statements (INSERT, UPDATE, DELETE, DROP etc.) to the database.".to_string(),
            "To start you should ALWAYS look at the tables in the database to see what you can query. Do NOT skip this step. Then you should query the schema of the most relevant tables.".to_string(),
            String::new(),
            "To call a tool, your ENTIRE response must be ONLY the JSON object, nothing else:".to_string(),
            r#"{"function": "tool_name", "arguments": {"arg1": "value1"}}"#.to_string(),
            "When you have the final answer, respond with plain text only, no JSON.".to_string(),
            String::new(),
            "Available tools:".to_string(),
            String::new(),
            format!("## {}", LIST_TABLES),
            "List the tables in the database.".to_string(),
            "Arguments: {}".to_string(),
            String::new(),
            format!("## {}", SCHEMA),
            "Get the schema and sample rows for the specified tables.".to_string(),
            r#"Arguments: {"table_names": "Table1, Table2"}"#.to_string(),
            String::new(),
            format!("## {}", QUERY),
            "Execute a read-only SQL query and get the rows back. If the query is not correct, an error message will be returned.".to_string(),
            r#"Arguments: {"query": "SELECT ..."}"#.to_string(),
        ];

        parts.join("\n")
    }
}

/// Accepts `"A, B"` or `["A", "B"]`.
fn table_names_arg(args: &serde_json::Value) -> Vec<String> {
    match args.get("table_names") {
        Some(serde_json::Value::String(s)) => s
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}
