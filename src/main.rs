//! VideoStudio
//!
//! Lossless video trimming and merging from the command line.
//!
//! # Usage
//!
//! ```bash
//! videostudio trim --input holiday.mp4 --start 1:05 --end 1:40
//! videostudio merge --input intro.mp4 --input talk.mp4 --move 2:1
//! videostudio preview --input holiday.mp4 --count 12
//! videostudio inspect --input holiday.mp4 --json
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error};

use videostudio::app::DefaultAppContainer;
use videostudio::cli::{commands, Cli, Commands};
use videostudio::config_initialization::{
    initialize_configuration_hierarchy, log_effective_configuration,
};
use videostudio::utils::logging::{LoggingConfig, LoggingSystem};

/// Main entry point for the VideoStudio CLI application
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = initialize_configuration_hierarchy(&cli)?;
    LoggingSystem::new(LoggingConfig {
        level: config.log_level.clone(),
        json: config.log_json,
    })
    .initialize()?;
    log_effective_configuration(&config);

    let container = DefaultAppContainer::new(&config);

    let result = match cli.command {
        Commands::Trim(args) => commands::trim(&container, args).await,
        Commands::Merge(args) => commands::merge(&container, args).await,
        Commands::Preview(args) => commands::preview(&container, &config, args).await,
        Commands::Scrub(args) => commands::scrub(&container, args).await,
        Commands::Inspect(args) => commands::inspect(&container, args).await,
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    } else {
        debug!("VideoStudio completed successfully");
    }
    result
}
