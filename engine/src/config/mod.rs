//! Configuration management
//!
//! This module handles loading, validation, and management of the Courtside configuration.
//! Configuration is stored in TOML format at ~/.courtside/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **llm**: Provider settings, default provider, per-call timeout
//! - **database**: Statistics database location and query limits
//! - **assistant**: Home team, team vocabulary, memory window, retry bounds
//! - **server**: HTTP bind address and allowed CORS origins
//!
//! # Path Expansion
//!
//! `~` in `database.path` is expanded to the user's home directory. The
//! database file is never created, since it is opened read-only.
//!
//! # Examples
//!
//! ```no_run
//! use courtside_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Database: {:?}", config.database.path);
//! println!("Default provider: {}", config.llm.default_provider);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Sentinel entity used when a question names no comparison team
pub const CONFERENCE_AVERAGE: &str = "Conference Average";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Statistics database settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Question-answering pipeline settings
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Default LLM provider (openai, ollama)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Timeout applied to every provider call, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// OpenAI provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for OpenAI API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Environment variable holding the API key
    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

/// Statistics database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path (supports ~ expansion)
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Row limit the SQL agent is told to apply
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Hard cap on rows rendered back to the agent
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    /// Connection pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Question-answering pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Team the assistant works for
    #[serde(default = "default_home_team")]
    pub home_team: String,

    /// Closed vocabulary of known teams
    #[serde(default = "default_teams")]
    pub teams: Vec<String>,

    /// Number of memory entries rendered into prompts
    #[serde(default = "default_memory_window")]
    pub memory_window: usize,

    /// Attempts allowed per sub-query before it is abandoned
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Upper bound on planner output
    #[serde(default = "default_max_sub_queries")]
    pub max_sub_queries: usize,

    /// Tool-loop iterations allowed per SQL agent invocation
    #[serde(default = "default_max_agent_iterations")]
    pub max_agent_iterations: usize,

    /// Wall-clock bound on one sub-query attempt, in seconds
    #[serde(default = "default_sub_query_timeout_secs")]
    pub sub_query_timeout_secs: u64,

    /// Run the presentation-only format pass over final answers
    #[serde(default)]
    pub format_answers: bool,

    /// Conversation threads kept in memory; the least recently used thread
    /// is dropped when a new one would exceed this
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by CORS
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_database_path() -> PathBuf {
    PathBuf::from("~/.courtside/ucd-basketball.db")
}

fn default_top_k() -> usize {
    5
}

fn default_max_rows() -> usize {
    50
}

fn default_max_connections() -> u32 {
    5
}

fn default_home_team() -> String {
    "UC Davis".to_string()
}

fn default_teams() -> Vec<String> {
    [
        "UC Davis",
        "UC Irvine",
        "UC Riverside",
        "UC San Diego",
        "UC Santa Barbara",
        "Cal Poly",
        "Cal State Bakersfield",
        "Cal State Fullerton",
        "Cal State Northridge",
        "Long Beach State",
        "Hawai'i",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}

fn default_memory_window() -> usize {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_sub_queries() -> usize {
    8
}

fn default_max_agent_iterations() -> usize {
    10
}

fn default_sub_query_timeout_secs() -> u64 {
    180
}

fn default_max_threads() -> usize {
    1000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            request_timeout_secs: default_request_timeout_secs(),
            openai: OpenAIConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            temperature: default_temperature(),
            api_key_env: default_openai_api_key_env(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
            temperature: default_temperature(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            top_k: default_top_k(),
            max_rows: default_max_rows(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            home_team: default_home_team(),
            teams: default_teams(),
            memory_window: default_memory_window(),
            max_retries: default_max_retries(),
            max_sub_queries: default_max_sub_queries(),
            max_agent_iterations: default_max_agent_iterations(),
            sub_query_timeout_secs: default_sub_query_timeout_secs(),
            format_answers: false,
            max_threads: default_max_threads(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            llm: LLMConfig::default(),
            database: DatabaseConfig::default(),
            assistant: AssistantConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.courtside/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse, validate and expand a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        config.process_paths()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default();
        config.validate()?;

        // Serialize before expansion so the file keeps portable ~ paths
        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        config.process_paths()?;
        Ok(config)
    }

    /// Get the default configuration file path (~/.courtside/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".courtside").join("config.toml"))
    }

    /// Check field values without touching the filesystem
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_providers = ["openai", "ollama"];
        if !valid_providers.contains(&self.llm.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.llm.default_provider,
                valid_providers.join(", ")
            )));
        }

        if self.llm.request_timeout_secs == 0 {
            return Err(EngineError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.database.top_k == 0 || self.database.max_rows == 0 {
            return Err(EngineError::Config(
                "top_k and max_rows must be greater than 0".to_string(),
            ));
        }

        let assistant = &self.assistant;
        if assistant.max_retries == 0 {
            return Err(EngineError::Config(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if assistant.memory_window == 0 {
            return Err(EngineError::Config(
                "memory_window must be at least 1".to_string(),
            ));
        }
        if assistant.max_sub_queries == 0 || assistant.max_agent_iterations == 0 {
            return Err(EngineError::Config(
                "max_sub_queries and max_agent_iterations must be at least 1".to_string(),
            ));
        }
        if assistant.max_threads == 0 {
            return Err(EngineError::Config(
                "max_threads must be at least 1".to_string(),
            ));
        }
        if assistant.sub_query_timeout_secs == 0 {
            return Err(EngineError::Config(
                "sub_query_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if !assistant
            .teams
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&assistant.home_team))
        {
            return Err(EngineError::Config(format!(
                "home_team '{}' is not in the teams list",
                assistant.home_team
            )));
        }
        if assistant
            .teams
            .iter()
            .any(|t| t.eq_ignore_ascii_case(CONFERENCE_AVERAGE))
        {
            return Err(EngineError::Config(format!(
                "'{}' is reserved and cannot be listed as a team",
                CONFERENCE_AVERAGE
            )));
        }

        Ok(())
    }

    /// Expand ~ in paths
    fn process_paths(&mut self) -> Result<(), EngineError> {
        self.database.path = expand_path(&self.database.path)?;
        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
