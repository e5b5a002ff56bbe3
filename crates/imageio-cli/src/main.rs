//! imageio CLI - Main entry point

use clap::Parser;
use imageio_cli::commands::{self, export::ExportKind};
use imageio_cli::{BrandsCommand, Cli, Commands, ExportCommand};
use imageio_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // Pick up IMAGEIO_SERVER_URL from a local .env before parsing
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Verbose mode logs debug output to the console; otherwise only warnings
    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    };
    let log_config = LogConfig::builder()
        .level(level)
        .output(LogOutput::Console)
        .log_file_prefix("imageio-cli")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The CLI works without logging
    let _guard = init_logging(&log_config).ok();

    if let Err(e) = execute_command(cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: Cli) -> imageio_cli::Result<()> {
    let server_url = cli.server_url;

    match cli.command {
        Commands::Brands { command } => match command {
            BrandsCommand::List => commands::brands::list(server_url).await,
            BrandsCommand::Create { name, kind } => {
                commands::brands::create(server_url, name, kind).await
            },
            BrandsCommand::Delete { id } => commands::brands::delete(server_url, id).await,
        },

        Commands::Import { brand_id, file } => {
            commands::import::run(server_url, brand_id, file).await
        },

        Commands::Export { command } => match command {
            ExportCommand::Zip { brand_id, output } => {
                commands::export::run(server_url, ExportKind::Archive, brand_id, output).await
            },
            ExportCommand::Links { brand_id, output } => {
                commands::export::run(server_url, ExportKind::Links, brand_id, output).await
            },
        },
    }
}
