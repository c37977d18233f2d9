//! Frame surface decoding single frames through `ffmpeg`

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::trace;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;
use crate::utils::time::format_arg_seconds;

/// Decode surface that snapshots one RGB frame per capture
///
/// Seeking only records the position; the decode happens on capture, so a
/// seek is settled as soon as it returns.
pub struct FfmpegFrameSurface {
    binary: PathBuf,
    attached: Option<(SourceId, PathBuf)>,
    position: f64,
}

impl FfmpegFrameSurface {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            attached: None,
            position: 0.0,
        }
    }

    async fn decode(
        &self,
        path: &Path,
        seek: &[String],
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, DomainError> {
        let output = Command::new(&self.binary)
            .args(["-hide_banner", "-nostdin", "-v", "error"])
            .args(seek)
            .arg("-i")
            .arg(path)
            .args(["-frames:v", "1", "-an", "-vf"])
            .arg(format!("scale={}:{}", width, height))
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                DomainError::CaptureError(format!("cannot run {}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            return Err(DomainError::CaptureError(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl FrameSurfacePort for FfmpegFrameSurface {
    async fn attach(&mut self, source: &MediaSource) -> Result<(), DomainError> {
        if matches!(&self.attached, Some((id, _)) if *id == source.id()) {
            return Ok(());
        }
        if tokio::fs::metadata(source.location()).await.is_err() {
            return Err(DomainError::CaptureError(format!(
                "{} is not readable",
                source.name()
            )));
        }
        self.attached = Some((source.id(), source.location().to_path_buf()));
        self.position = 0.0;
        Ok(())
    }

    async fn seek(&mut self, timestamp: f64) -> Result<(), DomainError> {
        if self.attached.is_none() {
            return Err(DomainError::CaptureError("no source attached".to_string()));
        }
        self.position = timestamp.max(0.0);
        Ok(())
    }

    async fn capture(&mut self, width: u32, height: u32) -> Result<RasterImage, DomainError> {
        let Some((_, path)) = self.attached.clone() else {
            return Err(DomainError::CaptureError("no source attached".to_string()));
        };
        if width == 0 || height == 0 {
            return Err(DomainError::CaptureError(format!(
                "invalid capture size {}x{}",
                width, height
            )));
        }

        let seek = vec!["-ss".to_string(), format_arg_seconds(self.position)];
        let mut pixels = self.decode(&path, &seek, width, height).await?;
        if pixels.is_empty() && self.position > 0.0 {
            // Positions at the very end decode nothing; fall back to the last second
            trace!(position = self.position, "No frame at position, retrying from the end");
            let tail = vec!["-sseof".to_string(), "-1".to_string()];
            pixels = self.decode(&path, &tail, width, height).await?;
        }

        let expected = width as usize * height as usize * 3;
        if pixels.len() > expected {
            pixels.truncate(expected);
        }
        RasterImage::from_rgb(width, height, pixels)
    }

    async fn detach(&mut self) {
        self.attached = None;
        self.position = 0.0;
    }
}
