//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;
use clap_num::number_range;

/// Frames in a preview strip
fn strip_count(s: &str) -> Result<usize, String> {
    number_range(s, 1, 120)
}

/// Parse a `FROM:TO` clip move, positions counted from 1
fn clip_move(s: &str) -> Result<(usize, usize), String> {
    let (from, to) = s
        .split_once(':')
        .ok_or_else(|| format!("expected FROM:TO, got '{}'", s))?;
    let position = |v: &str| -> Result<usize, String> {
        let n: usize = v
            .trim()
            .parse()
            .map_err(|_| format!("invalid clip position '{}'", v))?;
        if n == 0 {
            return Err("clip positions start at 1".to_string());
        }
        Ok(n - 1)
    };
    Ok((position(from)?, position(to)?))
}

/// Arguments for the trim command
#[derive(Args, Debug)]
pub struct TrimArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Start marker (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long, default_value = "0")]
    pub start: String,

    /// End marker (default: end of the video)
    #[arg(short, long)]
    pub end: Option<String>,
}

/// Arguments for the merge command
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Clips or directories of clips, in merge order
    #[arg(short, long = "input", required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Move the clip at FROM to position TO before merging (1-based, repeatable)
    #[arg(long = "move", value_name = "FROM:TO", value_parser = clip_move)]
    pub moves: Vec<(usize, usize)>,

    /// Drop the clip at this position before merging (1-based, repeatable)
    #[arg(long = "remove", value_name = "POSITION")]
    pub removals: Vec<usize>,
}

/// Arguments for the preview command
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Number of frames (default from config)
    #[arg(short, long, value_parser = strip_count)]
    pub count: Option<usize>,

    /// Directory for the PNG files
    #[arg(short, long, default_value = "preview")]
    pub output: PathBuf,
}

/// Arguments for the scrub command
#[derive(Args, Debug)]
pub struct ScrubArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Position (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long)]
    pub at: String,

    /// PNG file to write
    #[arg(short, long, default_value = "frame.png")]
    pub output: PathBuf,
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
