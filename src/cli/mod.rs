//! CLI module for VideoStudio
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// VideoStudio
///
/// Lossless trimming and joining of video clips. Every cut and join is a
/// stream copy through an ffmpeg engine session, so nothing is re-encoded.
#[derive(Parser, Debug)]
#[command(name = "videostudio")]
#[command(about = "VideoStudio - Lossless video trimming and merging")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/videostudio/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Directory that receives finished videos
    #[arg(long, global = true)]
    pub out_dir: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cut a range out of a video without re-encoding
    Trim(args::TrimArgs),
    /// Join clips end to end without re-encoding
    Merge(args::MergeArgs),
    /// Export a strip of evenly spaced preview frames
    Preview(args::PreviewArgs),
    /// Export the frame at one position
    Scrub(args::ScrubArgs),
    /// Show duration and stream parameters of a video
    Inspect(args::InspectArgs),
}
