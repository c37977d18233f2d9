//! FFmpeg process engine
//!
//! Runs the `ffmpeg` binary as the transcoding engine. A private temporary
//! directory plays the engine filesystem: every command runs with that
//! directory as its working directory and only ever names files inside it.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::ports::*;

/// Arguments put ahead of every command
const COMMAND_PREFIX: [&str; 8] = [
    "-hide_banner",
    "-nostdin",
    "-y",
    "-nostats",
    "-loglevel",
    "info",
    "-progress",
    "pipe:1",
];

/// Transcoding engine backed by an `ffmpeg` subprocess
pub struct FfmpegProcessEngine {
    binary: PathBuf,
    vfs: OnceLock<TempDir>,
}

impl FfmpegProcessEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            vfs: OnceLock::new(),
        }
    }

    /// Root of the engine filesystem once loaded
    pub fn root(&self) -> Option<&Path> {
        self.vfs.get().map(|dir| dir.path())
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, EngineFault> {
        validate_name(name)?;
        let root = self
            .root()
            .ok_or_else(|| EngineFault::Unavailable("engine is not loaded".to_string()))?;
        Ok(root.join(name))
    }
}

#[async_trait]
impl TranscodeEnginePort for FfmpegProcessEngine {
    async fn load(&self) -> Result<(), EngineFault> {
        let output = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                EngineFault::Unavailable(format!("{}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            return Err(EngineFault::Unavailable(format!(
                "{} -version exited with {}",
                self.binary.display(),
                output.status
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string();
        info!(%version, "FFmpeg engine available");

        if self.vfs.get().is_none() {
            let dir = tempfile::Builder::new()
                .prefix("videostudio-vfs-")
                .tempdir()
                .map_err(|e| EngineFault::Io(format!("cannot create engine filesystem: {}", e)))?;
            debug!(root = %dir.path().display(), "Engine filesystem created");
            // A concurrent load may have won; its directory is kept and ours dropped
            let _ = self.vfs.set(dir);
        }
        Ok(())
    }

    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), EngineFault> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| EngineFault::Io(format!("{}: {}", name, e)))
    }

    async fn exec(&self, args: &[String], events: EngineEvents) -> Result<i32, EngineFault> {
        let root = self
            .root()
            .ok_or_else(|| EngineFault::Unavailable("engine is not loaded".to_string()))?;

        let mut child = Command::new(&self.binary)
            .args(COMMAND_PREFIX)
            .args(args)
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineFault::Crashed(format!("failed to start ffmpeg: {}", e)))?;

        // Output length: the requested span when given, else the probed input
        let total = Arc::new(Mutex::new(requested_span(args)));
        let span_given = requested_span(args).is_some();

        let stderr_task = child.stderr.take().map(|stderr| {
            let events = events.clone();
            let total = Arc::clone(&total);
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if !span_given {
                        if let Some(duration) = parse_duration_line(&line) {
                            if let Ok(mut slot) = total.lock() {
                                slot.get_or_insert(duration);
                            }
                        }
                    }
                    let line = line.trim_end().to_string();
                    if !line.is_empty() {
                        let _ = events.send(EngineEvent::Log(line));
                    }
                }
            })
        });

        let stdout_task = child.stdout.take().map(|stdout| {
            let events = events.clone();
            let total = Arc::clone(&total);
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line.trim() == "progress=end" {
                        let _ = events.send(EngineEvent::Progress(1.0));
                        continue;
                    }
                    let Some(micros) = parse_progress_micros(&line) else {
                        continue;
                    };
                    let total = total.lock().ok().and_then(|slot| *slot);
                    if let Some(total) = total.filter(|t| *t > 0.0) {
                        let fraction = (micros as f64 / 1_000_000.0 / total).clamp(0.0, 1.0);
                        let _ = events.send(EngineEvent::Progress(fraction));
                    }
                }
            })
        });

        let status = child
            .wait()
            .await
            .map_err(|e| EngineFault::Crashed(e.to_string()))?;

        for task in [stderr_task, stdout_task].into_iter().flatten() {
            let _ = task.await;
        }

        match status.code() {
            Some(code) => Ok(code),
            None => Err(EngineFault::Crashed(format!(
                "ffmpeg terminated by signal ({})",
                status
            ))),
        }
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineFault> {
        let path = self.resolve(name)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EngineFault::NotFound(name.to_string()),
            _ => EngineFault::Io(format!("{}: {}", name, e)),
        })
    }

    async fn delete_file(&self, name: &str) -> Result<(), EngineFault> {
        let path = self.resolve(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngineFault::Io(format!("{}: {}", name, e))),
        }
    }
}

/// Engine file names are plain, single-component names
fn validate_name(name: &str) -> Result<(), EngineFault> {
    let plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0');
    if plain {
        Ok(())
    } else {
        Err(EngineFault::InvalidName(name.to_string()))
    }
}

/// Input duration from a `Duration: HH:MM:SS.xx, ...` banner line
fn parse_duration_line(line: &str) -> Option<f64> {
    let rest = line.trim_start().strip_prefix("Duration:")?;
    let stamp = rest.split(',').next()?.trim();
    let mut parts = stamp.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Output position in microseconds from a `-progress` key/value line
///
/// `out_time_ms` is microseconds too, despite its name.
fn parse_progress_micros(line: &str) -> Option<u64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "out_time_us" | "out_time_ms" => value.trim().parse().ok(),
        _ => None,
    }
}

/// Value of the last `-t` option, if any
fn requested_span(args: &[String]) -> Option<f64> {
    args.windows(2)
        .filter(|pair| pair[0] == "-t")
        .filter_map(|pair| pair[1].parse::<f64>().ok())
        .last()
        .filter(|span| *span > 0.0)
}
