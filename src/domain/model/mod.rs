// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::errors::DomainError;

/// Smallest trim span, in seconds
pub const MIN_TRIM_SPAN: f64 = 1.0;

/// Slack for float comparisons against the minimum span
const SPAN_EPSILON: f64 = 1e-9;

/// Time specification with precision - represents time in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    /// Parse time string: seconds (`83.5`), `MM:SS.ms` or `HH:MM:SS.ms`
    pub fn parse(time_str: &str) -> Result<Self, DomainError> {
        let trimmed = time_str.trim();

        if let Ok(seconds) = trimmed.parse::<f64>() {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(DomainError::BadArgs(format!(
                    "Time must be a non-negative number: {}",
                    time_str
                )));
            }
            return Ok(Self::from_seconds(seconds));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        let (hours, minutes, seconds) = match parts.as_slice() {
            [m, s] => (0, Self::parse_unit(m, "minutes")?, Self::parse_seconds(s)?),
            [h, m, s] => {
                let minutes = Self::parse_unit(m, "minutes")?;
                if minutes >= 60 {
                    return Err(DomainError::BadArgs(
                        "Minutes must be less than 60".to_string(),
                    ));
                }
                (Self::parse_unit(h, "hours")?, minutes, Self::parse_seconds(s)?)
            }
            _ => {
                return Err(DomainError::BadArgs(format!(
                    "Invalid time format: {}. Supported formats: seconds (e.g., 123.45), MM:SS.ms (e.g., 2:30.5), HH:MM:SS.ms (e.g., 1:02:30.5)",
                    time_str
                )))
            }
        };

        Ok(Self::from_seconds(
            hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds,
        ))
    }

    fn parse_unit(part: &str, what: &str) -> Result<u32, DomainError> {
        part.parse::<u32>()
            .map_err(|_| DomainError::BadArgs(format!("Invalid {} format: {}", what, part)))
    }

    fn parse_seconds(part: &str) -> Result<f64, DomainError> {
        let seconds = part
            .parse::<f64>()
            .map_err(|_| DomainError::BadArgs(format!("Invalid seconds format: {}", part)))?;
        if !(0.0..60.0).contains(&seconds) {
            return Err(DomainError::BadArgs(
                "Seconds must be less than 60".to_string(),
            ));
        }
        Ok(seconds)
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::utils::time::format_clock(self.seconds))
    }
}

/// Process-unique identity of a media source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SourceId(u64);

impl SourceId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A user-selected video
///
/// The bytes stay with the caller (a local file); the handle only records where
/// they live. Cloning shares the handle, so two clones are the same source.
#[derive(Debug, Clone)]
pub struct MediaSource {
    inner: Arc<MediaSourceInner>,
}

#[derive(Debug)]
struct MediaSourceInner {
    id: SourceId,
    name: String,
    size: u64,
    content_type: &'static str,
    location: PathBuf,
}

impl MediaSource {
    /// Create a handle for a file already known to be video content
    pub fn new(
        name: impl Into<String>,
        size: u64,
        content_type: &'static str,
        location: impl Into<PathBuf>,
    ) -> Self {
        Self {
            inner: Arc::new(MediaSourceInner {
                id: SourceId::next(),
                name: name.into(),
                size,
                content_type,
                location: location.into(),
            }),
        }
    }

    /// Open a local file as a media source, rejecting non-video content types
    pub async fn open(path: &Path) -> Result<Self, DomainError> {
        let content_type = video_content_type(path).ok_or_else(|| {
            DomainError::BadArgs(format!("Not a video file: {}", path.display()))
        })?;
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            DomainError::FsFail(format!("Cannot read {}: {}", path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(DomainError::BadArgs(format!(
                "Not a regular file: {}",
                path.display()
            )));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| DomainError::BadArgs(format!("Invalid path: {}", path.display())))?;

        Ok(Self::new(name, metadata.len(), content_type, path))
    }

    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn size(&self) -> u64 {
        self.inner.size
    }

    pub fn content_type(&self) -> &'static str {
        self.inner.content_type
    }

    pub fn location(&self) -> &Path {
        &self.inner.location
    }

    /// Size in MiB, as shown next to each clip in a merge list
    pub fn size_mib(&self) -> f64 {
        self.inner.size as f64 / (1024.0 * 1024.0)
    }

    /// Read the full payload for staging
    pub async fn read_bytes(&self) -> Result<Vec<u8>, DomainError> {
        tokio::fs::read(&self.inner.location).await.map_err(|e| {
            DomainError::FsFail(format!("Cannot read {}: {}", self.inner.name, e))
        })
    }
}

impl PartialEq for MediaSource {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for MediaSource {}

/// Video content type for a path, judged by extension
pub fn video_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    let mime = match ext.as_str() {
        "mp4" => "video/mp4",
        "m4v" => "video/x-m4v",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mpg" | "mpeg" => "video/mpeg",
        "ts" | "m2ts" => "video/mp2t",
        "ogv" => "video/ogg",
        "3gp" => "video/3gpp",
        "flv" => "video/x-flv",
        "wmv" => "video/x-ms-wmv",
        _ => return None,
    };
    Some(mime)
}

/// Lifecycle of the transcoding engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineState {
    Uninitialized,
    Loading,
    Ready,
    Faulted(String),
}

impl EngineState {
    pub fn is_ready(&self) -> bool {
        matches!(self, EngineState::Ready)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Uninitialized => write!(f, "uninitialized"),
            EngineState::Loading => write!(f, "loading"),
            EngineState::Ready => write!(f, "ready"),
            EngineState::Faulted(reason) => write!(f, "faulted: {}", reason),
        }
    }
}

/// Start/end markers over a known media duration
///
/// Mutators never fail: they return a copy with the requested marker clamped so
/// that `0 <= start`, `end <= duration` and `end - start >= MIN_TRIM_SPAN` keep
/// holding (for any duration of at least `MIN_TRIM_SPAN`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrimRange {
    duration: f64,
    start: f64,
    end: f64,
}

impl TrimRange {
    /// Full range over a freshly probed duration
    pub fn new(duration: f64) -> Result<Self, DomainError> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(DomainError::BadArgs(format!(
                "Media duration must be a non-negative number, got {}",
                duration
            )));
        }
        Ok(Self {
            duration,
            start: 0.0,
            end: duration,
        })
    }

    /// Exact range, rejected instead of clamped when out of bounds
    pub fn from_bounds(duration: f64, start: f64, end: f64) -> Result<Self, DomainError> {
        let range = Self {
            duration,
            start,
            end,
        };
        Self::new(duration)?;
        range.validate()?;
        Ok(range)
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Length of the selected range
    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    /// Move the start marker, clamped to `[0, end - MIN_TRIM_SPAN]`
    pub fn with_start(self, start: f64) -> Self {
        if start.is_nan() {
            return self;
        }
        let upper = (self.end - MIN_TRIM_SPAN).max(0.0);
        Self {
            start: start.min(upper).max(0.0),
            ..self
        }
    }

    /// Move the end marker, clamped to `[start + MIN_TRIM_SPAN, duration]`
    pub fn with_end(self, end: f64) -> Self {
        if end.is_nan() {
            return self;
        }
        let lower = self.start + MIN_TRIM_SPAN;
        Self {
            end: end.max(lower).min(self.duration),
            ..self
        }
    }

    /// Check the range can be committed
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.start.is_finite() || self.start < 0.0 {
            return Err(DomainError::PreconditionError(format!(
                "Trim start {} is before the beginning of the media",
                self.start
            )));
        }
        if !self.end.is_finite() || self.end > self.duration {
            return Err(DomainError::PreconditionError(format!(
                "Trim end {} is past the media duration {}",
                self.end, self.duration
            )));
        }
        if self.span() + SPAN_EPSILON < MIN_TRIM_SPAN {
            return Err(DomainError::PreconditionError(format!(
                "Trim range [{}, {}] is shorter than {} second",
                self.start, self.end, MIN_TRIM_SPAN
            )));
        }
        Ok(())
    }
}

/// Ordered clips to concatenate
///
/// Never empty: removing the last clip discards the sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeSequence {
    sources: Vec<MediaSource>,
}

impl MergeSequence {
    /// Minimum number of clips for a merge commit
    pub const MIN_SOURCES: usize = 2;

    /// Start a sequence from an upload batch
    pub fn from_sources(sources: Vec<MediaSource>) -> Result<Self, DomainError> {
        let sequence = Self {
            sources: Vec::with_capacity(sources.len()),
        }
        .appended(sources);
        if sequence.sources.is_empty() {
            return Err(DomainError::BadArgs(
                "A merge sequence needs at least one clip".to_string(),
            ));
        }
        Ok(sequence)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn sources(&self) -> &[MediaSource] {
        &self.sources
    }

    /// Add clips at the end; a source already in the sequence is skipped
    pub fn appended(mut self, sources: impl IntoIterator<Item = MediaSource>) -> Self {
        for source in sources {
            if !self.sources.contains(&source) {
                self.sources.push(source);
            }
        }
        self
    }

    /// Remove the clip at `index`; `None` when that empties the sequence
    pub fn removed(mut self, index: usize) -> Result<Option<Self>, DomainError> {
        self.check_index(index)?;
        self.sources.remove(index);
        if self.sources.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self))
        }
    }

    /// Move the clip at `from` so it ends up at `to`; others keep their relative order
    pub fn moved(mut self, from: usize, to: usize) -> Result<Self, DomainError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from != to {
            let source = self.sources.remove(from);
            self.sources.insert(to, source);
        }
        Ok(self)
    }

    /// Check the sequence can be committed
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.sources.len() < Self::MIN_SOURCES {
            return Err(DomainError::PreconditionError(format!(
                "Merging needs at least {} clips, got {}",
                Self::MIN_SOURCES,
                self.sources.len()
            )));
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<(), DomainError> {
        if index >= self.sources.len() {
            return Err(DomainError::BadArgs(format!(
                "Clip position {} is out of range (sequence has {} clips)",
                index,
                self.sources.len()
            )));
        }
        Ok(())
    }
}

/// Which operation a job performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobKind {
    Trim,
    Merge,
}

/// Job status as seen by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    Idle,
    Processing,
    Completed,
    Error,
}

/// The single active processing job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingJob {
    pub kind: Option<JobKind>,
    pub status: JobStatus,
    /// Percentage in `[0, 100]`
    pub progress: f64,
    pub error_message: Option<String>,
}

impl Default for ProcessingJob {
    fn default() -> Self {
        Self::idle()
    }
}

impl ProcessingJob {
    pub fn idle() -> Self {
        Self {
            kind: None,
            status: JobStatus::Idle,
            progress: 0.0,
            error_message: None,
        }
    }

    /// Enter `Processing`. An unacknowledged error or a running job blocks this.
    pub fn begin(&mut self, kind: JobKind) -> Result<(), DomainError> {
        match self.status {
            JobStatus::Processing => Err(DomainError::PreconditionError(
                "Another job is already processing".to_string(),
            )),
            JobStatus::Error => Err(DomainError::PreconditionError(
                "The previous job failed; reset before committing again".to_string(),
            )),
            JobStatus::Idle | JobStatus::Completed => {
                *self = Self {
                    kind: Some(kind),
                    status: JobStatus::Processing,
                    progress: 0.0,
                    error_message: None,
                };
                Ok(())
            }
        }
    }

    /// Record progress; returns whether the visible value changed
    pub fn set_progress(&mut self, percent: f64) -> bool {
        if self.status != JobStatus::Processing || percent.is_nan() {
            return false;
        }
        let percent = percent.clamp(0.0, 100.0);
        if (percent - self.progress).abs() < f64::EPSILON {
            return false;
        }
        self.progress = percent;
        true
    }

    pub fn complete(&mut self) {
        if self.status == JobStatus::Processing {
            self.status = JobStatus::Completed;
            self.progress = 100.0;
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        if self.status == JobStatus::Processing {
            self.status = JobStatus::Error;
            self.error_message = Some(message.into());
        }
    }

    /// Enter `Error` for a failure outside any job run, such as the engine
    /// failing to load. Returns whether the job changed.
    pub fn fault(&mut self, message: impl Into<String>) -> bool {
        if self.status == JobStatus::Processing {
            return false;
        }
        let message = message.into();
        if self.status == JobStatus::Error && self.error_message.as_deref() == Some(&message) {
            return false;
        }
        *self = Self {
            kind: None,
            status: JobStatus::Error,
            progress: 0.0,
            error_message: Some(message),
        };
        true
    }

    /// Acknowledge a finished job and go back to `Idle`
    pub fn reset(&mut self) -> Result<(), DomainError> {
        if self.status == JobStatus::Processing {
            return Err(DomainError::PreconditionError(
                "Cannot reset while a job is processing".to_string(),
            ));
        }
        *self = Self::idle();
        Ok(())
    }
}

/// Finished output ready to hand off to delivery
#[derive(Debug, Clone)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub suggested_name: String,
    pub mime_type: String,
    pub produced_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(bytes: Vec<u8>, suggested_name: impl Into<String>, mime_type: &str) -> Self {
        Self {
            bytes,
            suggested_name: suggested_name.into(),
            mime_type: mime_type.to_string(),
            produced_at: Utc::now(),
        }
    }
}

/// Where the delivery collaborator put an artifact
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReceipt {
    pub location: String,
    pub bytes_written: u64,
}

/// Engine command for a trim, with the names it stages and produces
#[derive(Debug, Clone, PartialEq)]
pub struct TrimPlan {
    pub input_name: String,
    pub output_name: String,
    pub args: Vec<String>,
}

/// Engine command for a merge, with the manifest that orders the inputs
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    pub input_names: Vec<String>,
    pub manifest_name: String,
    pub manifest: String,
    pub output_name: String,
    pub args: Vec<String>,
}

/// RGB24 raster
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RasterImage {
    /// Wrap raw RGB24 pixels, checking the buffer length
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, DomainError> {
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(DomainError::CaptureError(format!(
                "Expected {} bytes for a {}x{} frame, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }
}

/// One captured preview frame
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewFrame {
    pub index: usize,
    pub timestamp: f64,
    pub image: RasterImage,
}

/// Probe result for a source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaProbe {
    pub duration: f64,
    pub container: String,
    pub video: Option<VideoSummary>,
    pub audio: Option<AudioSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoSummary {
    pub codec: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioSummary {
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u32,
}
