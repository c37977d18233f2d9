//! Configuration initialization and hierarchy management

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::adapters::{StudioConfig, TomlConfigAdapter};
use crate::cli::Cli;
use crate::domain::rules::MergePreflight;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "VIDEOSTUDIO_";

/// Resolve configuration following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(cli: &Cli) -> Result<StudioConfig> {
    // Steps 1 and 2: defaults, then the config file
    let mut config = TomlConfigAdapter::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration file")?;

    // Step 3: environment variables
    let env_overrides = apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    // Step 4: CLI arguments
    let cli_overrides = apply_cli_overrides(&mut config, cli);

    TomlConfigAdapter::validate(&config).context("Invalid configuration")?;

    if env_overrides + cli_overrides > 0 {
        debug!(
            env = env_overrides,
            cli = cli_overrides,
            "Applied configuration overrides"
        );
    }
    Ok(config)
}

/// Log where the effective configuration points, once logging is up
pub fn log_effective_configuration(config: &StudioConfig) {
    info!(
        ffmpeg = %config.ffmpeg_path.display(),
        output_dir = %config.output_dir.display(),
        preflight = ?config.merge_preflight,
        "Configuration resolved"
    );
}

/// Apply `VIDEOSTUDIO_*` variables; returns how many were applied
pub fn apply_env_overrides(
    config: &mut StudioConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<usize> {
    let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|v| !v.is_empty());
    let mut applied = 0;

    if let Some(value) = var("FFMPEG_PATH") {
        config.ffmpeg_path = PathBuf::from(value);
        applied += 1;
    }
    if let Some(value) = var("FFPROBE_PATH") {
        config.ffprobe_path = PathBuf::from(value);
        applied += 1;
    }
    if let Some(value) = var("OUTPUT_DIR") {
        config.output_dir = PathBuf::from(value);
        applied += 1;
    }
    if let Some(value) = var("LOG_LEVEL") {
        config.log_level = value;
        applied += 1;
    }
    if let Some(value) = var("LOG_JSON") {
        config.log_json = parse_flag("LOG_JSON", &value)?;
        applied += 1;
    }
    if let Some(value) = var("THUMBNAIL_COUNT") {
        config.thumbnail_count = parse_number("THUMBNAIL_COUNT", &value)?;
        applied += 1;
    }
    if let Some(value) = var("THUMBNAIL_WIDTH") {
        config.thumbnail_width = parse_number("THUMBNAIL_WIDTH", &value)?;
        applied += 1;
    }
    if let Some(value) = var("THUMBNAIL_HEIGHT") {
        config.thumbnail_height = parse_number("THUMBNAIL_HEIGHT", &value)?;
        applied += 1;
    }
    if let Some(value) = var("MERGE_PREFLIGHT") {
        config.merge_preflight = MergePreflight::parse(&value)?;
        applied += 1;
    }
    Ok(applied)
}

/// Apply global CLI flags; returns how many were applied
pub fn apply_cli_overrides(config: &mut StudioConfig, cli: &Cli) -> usize {
    let mut applied = 0;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
        applied += 1;
    }
    if cli.log_json {
        config.log_json = true;
        applied += 1;
    }
    if let Some(dir) = &cli.out_dir {
        config.output_dir = dir.clone();
        applied += 1;
    }
    applied
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{}{} must be a boolean, got '{}'", ENV_PREFIX, name, value),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{}{} must be a number, got '{}'", ENV_PREFIX, name, value))
}
