//! FFprobe adapter for media file probing

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Probe adapter backed by the `ffprobe` binary
pub struct FfprobeAdapter {
    binary: PathBuf,
}

impl FfprobeAdapter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl ProbePort for FfprobeAdapter {
    async fn probe_media(&self, source: &MediaSource) -> Result<MediaProbe, DomainError> {
        debug!(source = source.name(), "Probing media");
        let output = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(source.location())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                DomainError::ProbeError(format!("cannot run {}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DomainError::ProbeError(format!(
                "{}: {}",
                source.name(),
                stderr.trim()
            )));
        }

        parse_probe_json(&output.stdout)
            .map_err(|e| DomainError::ProbeError(format!("{}: {}", source.name(), e)))
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    duration: Option<String>,
}

/// Reduce `ffprobe -print_format json` output to a `MediaProbe`
///
/// The container duration wins; the longest stream duration is the fallback.
fn parse_probe_json(json: &[u8]) -> Result<MediaProbe, String> {
    let parsed: ProbeOutput =
        serde_json::from_slice(json).map_err(|e| format!("unreadable probe output: {}", e))?;

    let stream_duration = parsed
        .streams
        .iter()
        .filter_map(|s| s.duration.as_deref()?.parse::<f64>().ok())
        .fold(None, |longest: Option<f64>, d| Some(longest.map_or(d, |l| l.max(d))));

    let duration = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref()?.parse::<f64>().ok())
        .or(stream_duration)
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| "no usable duration".to_string())?;

    let container = parsed
        .format
        .and_then(|f| f.format_name)
        .unwrap_or_else(|| "unknown".to_string());

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .map(|s| VideoSummary {
            codec: s.codec_name.clone().unwrap_or_else(|| "unknown".to_string()),
            width: s.width.unwrap_or(0),
            height: s.height.unwrap_or(0),
        });

    let audio = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .map(|s| AudioSummary {
            codec: s.codec_name.clone().unwrap_or_else(|| "unknown".to_string()),
            sample_rate: s
                .sample_rate
                .as_deref()
                .and_then(|r| r.parse().ok())
                .unwrap_or(0),
            channels: s.channels.unwrap_or(0),
        });

    Ok(MediaProbe {
        duration,
        container,
        video,
        audio,
    })
}
