//! Main entry point for the Warrant administration tool.
//!
//! Loads configuration, initializes logging and storage, runs one command and
//! prints its result as JSON on stdout.

use clap::Parser;
use tracing::error;
use warrant_server::{
    command,
    model::{AppState, Cli, Configuration, response},
    startup,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let configuration = Configuration::new(&cli)?;

    let logging_guard = startup::init_logging(&configuration.logging_config())?;

    let persistence = startup::init_persistence(&configuration).await?;
    let state = AppState::new(configuration, persistence);

    match command::execute(&cli.command, &state).await {
        Ok(data) => {
            println!("{}", serde_json::to_string_pretty(&response::Result::success(data))?);
            Ok(())
        }
        Err(e) => {
            error!(code = e.code().code, "Command failed: {}", e);
            println!("{}", serde_json::to_string_pretty(&response::Result::fail(&e))?);
            // Flush file logs before exiting
            drop(logging_guard);
            std::process::exit(1);
        }
    }
}
