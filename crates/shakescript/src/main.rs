//! Shakescript CLI binary.
//!
//! This binary provides command-line access to the story pipeline:
//! - Plan stories from a prompt
//! - Generate, validate and refine episode batches
//! - Inspect, summarize and delete stories

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, handle_story_command, report_error};

    // Parse command-line arguments
    let cli = Cli::parse();

    // Pick up GEMINI_API_KEY and DATABASE_URL from .env
    let _ = dotenvy::dotenv();

    // Initialize tracing
    if cli.telemetry {
        shakescript::init_telemetry()?;
    } else {
        let log_level = if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    // Execute the requested command
    let result = handle_story_command(cli.command, cli.json).await;

    if cli.telemetry {
        shakescript::shutdown_telemetry();
    }

    if let Err(e) = result {
        report_error(&e, cli.json);
        std::process::exit(1);
    }

    Ok(())
}
