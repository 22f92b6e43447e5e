// Courtside basketball analytics assistant
// Main entry point for the courtside binary

use clap::Parser;
use courtside_engine::cli::{Cli, Command};
use courtside_engine::config::Config;
use courtside_engine::handlers::{
    handle_ask, handle_doctor, handle_serve, handle_tables, OutputFormat,
};
use courtside_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over the config file; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    tracing::info!(
        "Courtside v{} ({} - {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    match cli.command {
        Command::Serve { host, port } => handle_serve(&config, host, port).await,
        Command::Ask { question, thread } => handle_ask(question, thread, &config, format).await,
        Command::Tables => handle_tables(&config, format).await,
        Command::Doctor => handle_doctor(&config, format).await,
    }
}
