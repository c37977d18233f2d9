//! In-memory adapters for tests and dry runs

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// What a `MockEngineAdapter` does when asked to run a command
#[derive(Debug, Clone)]
pub struct ExecScript {
    exit_code: i32,
    fault: Option<EngineFault>,
    log: Vec<String>,
    progress: Vec<f64>,
    output: Option<(String, Vec<u8>)>,
}

impl ExecScript {
    /// Exit cleanly after writing `bytes` as `output_name`
    pub fn success(output_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            exit_code: 0,
            fault: None,
            log: Vec::new(),
            progress: Vec::new(),
            output: Some((output_name.to_string(), bytes)),
        }
    }

    /// Exit with `code` after logging `log`, producing nothing
    pub fn exit(code: i32, log: Vec<String>) -> Self {
        Self {
            exit_code: code,
            fault: None,
            log,
            progress: Vec::new(),
            output: None,
        }
    }

    /// Abort with an engine fault
    pub fn crash(message: &str) -> Self {
        Self {
            exit_code: -1,
            fault: Some(EngineFault::Crashed(message.to_string())),
            log: Vec::new(),
            progress: Vec::new(),
            output: None,
        }
    }

    pub fn with_progress(mut self, fractions: Vec<f64>) -> Self {
        self.progress = fractions;
        self
    }

    pub fn with_log(mut self, lines: Vec<String>) -> Self {
        self.log = lines;
        self
    }
}

impl Default for ExecScript {
    fn default() -> Self {
        Self::exit(0, Vec::new())
    }
}

#[derive(Default)]
struct EngineRecord {
    files: HashMap<String, Vec<u8>>,
    written: Vec<(String, Vec<u8>)>,
    deleted: Vec<String>,
    executed: Vec<Vec<String>>,
}

/// Transcoding engine with an in-memory filesystem and scripted commands
pub struct MockEngineAdapter {
    load_error: Option<String>,
    load_delay: Duration,
    exec_delay: Duration,
    script: ExecScript,
    load_calls: AtomicUsize,
    running: AtomicUsize,
    max_running: AtomicUsize,
    record: Mutex<EngineRecord>,
}

impl MockEngineAdapter {
    pub fn new() -> Self {
        Self {
            load_error: None,
            load_delay: Duration::ZERO,
            exec_delay: Duration::ZERO,
            script: ExecScript::default(),
            load_calls: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
            record: Mutex::new(EngineRecord::default()),
        }
    }

    pub fn failing_load(mut self, reason: &str) -> Self {
        self.load_error = Some(reason.to_string());
        self
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn with_exec_delay(mut self, delay: Duration) -> Self {
        self.exec_delay = delay;
        self
    }

    pub fn with_script(mut self, script: ExecScript) -> Self {
        self.script = script;
        self
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    /// Highest number of commands that ran at the same time
    pub fn max_concurrent_execs(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    /// Names passed to `write_file`, in call order
    pub fn written_names(&self) -> Vec<String> {
        self.with_record(|r| r.written.iter().map(|(name, _)| name.clone()).collect())
    }

    /// Last payload written under `name`, even if since deleted
    pub fn written(&self, name: &str) -> Option<Vec<u8>> {
        self.with_record(|r| {
            r.written
                .iter()
                .rev()
                .find(|(written, _)| written == name)
                .map(|(_, bytes)| bytes.clone())
        })
    }

    pub fn deleted_names(&self) -> Vec<String> {
        self.with_record(|r| r.deleted.clone())
    }

    pub fn executed(&self) -> Vec<Vec<String>> {
        self.with_record(|r| r.executed.clone())
    }

    /// Current content of an engine file
    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.with_record(|r| r.files.get(name).cloned())
    }

    /// Names currently present in the engine filesystem, sorted
    pub fn file_names(&self) -> Vec<String> {
        let mut names = self.with_record(|r| r.files.keys().cloned().collect::<Vec<_>>());
        names.sort();
        names
    }

    fn with_record<T>(&self, f: impl FnOnce(&mut EngineRecord) -> T) -> T {
        match self.record.lock() {
            Ok(mut record) => f(&mut record),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl Default for MockEngineAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscodeEnginePort for MockEngineAdapter {
    async fn load(&self) -> Result<(), EngineFault> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        match &self.load_error {
            Some(reason) => Err(EngineFault::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), EngineFault> {
        self.with_record(|r| {
            r.written.push((name.to_string(), bytes.to_vec()));
            r.files.insert(name.to_string(), bytes.to_vec());
        });
        Ok(())
    }

    async fn exec(&self, args: &[String], events: EngineEvents) -> Result<i32, EngineFault> {
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(running, Ordering::SeqCst);
        self.with_record(|r| r.executed.push(args.to_vec()));

        for line in &self.script.log {
            let _ = events.send(EngineEvent::Log(line.clone()));
        }
        for fraction in &self.script.progress {
            let _ = events.send(EngineEvent::Progress(*fraction));
            tokio::task::yield_now().await;
        }
        if !self.exec_delay.is_zero() {
            tokio::time::sleep(self.exec_delay).await;
        }
        if let Some((name, bytes)) = &self.script.output {
            self.with_record(|r| r.files.insert(name.clone(), bytes.clone()));
        }

        self.running.fetch_sub(1, Ordering::SeqCst);
        match &self.script.fault {
            Some(fault) => Err(fault.clone()),
            None => Ok(self.script.exit_code),
        }
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineFault> {
        self.file(name)
            .ok_or_else(|| EngineFault::NotFound(name.to_string()))
    }

    async fn delete_file(&self, name: &str) -> Result<(), EngineFault> {
        self.with_record(|r| {
            r.deleted.push(name.to_string());
            r.files.remove(name);
        });
        Ok(())
    }
}

/// Probe adapter answering from a table keyed by source name
#[derive(Default)]
pub struct MockProbeAdapter {
    probes: HashMap<String, MediaProbe>,
    fallback: Option<MediaProbe>,
}

impl MockProbeAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_probe(mut self, name: &str, probe: MediaProbe) -> Self {
        self.probes.insert(name.to_string(), probe);
        self
    }

    /// Answer for every name without an explicit entry
    pub fn with_fallback(mut self, probe: MediaProbe) -> Self {
        self.fallback = Some(probe);
        self
    }

    /// An H.264/AAC 720p probe of the given duration
    pub fn h264_probe(duration: f64) -> MediaProbe {
        MediaProbe {
            duration,
            container: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
            video: Some(VideoSummary {
                codec: "h264".to_string(),
                width: 1280,
                height: 720,
            }),
            audio: Some(AudioSummary {
                codec: "aac".to_string(),
                sample_rate: 48000,
                channels: 2,
            }),
        }
    }
}

#[async_trait]
impl ProbePort for MockProbeAdapter {
    async fn probe_media(&self, source: &MediaSource) -> Result<MediaProbe, DomainError> {
        self.probes
            .get(source.name())
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| DomainError::ProbeError(format!("{}: no probe data", source.name())))
    }
}

/// What a `MockFrameSurface` has been asked to do
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SurfaceRecord {
    pub attached: Vec<String>,
    pub seeks: Vec<f64>,
    pub captures: usize,
    pub detaches: usize,
}

/// Frame surface producing solid frames whose red channel encodes the position
pub struct MockFrameSurface {
    record: Arc<Mutex<SurfaceRecord>>,
    capture_delay: Duration,
    attached: Option<SourceId>,
    position: f64,
}

impl MockFrameSurface {
    pub fn new() -> Self {
        Self {
            record: Arc::new(Mutex::new(SurfaceRecord::default())),
            capture_delay: Duration::ZERO,
            attached: None,
            position: 0.0,
        }
    }

    pub fn with_capture_delay(mut self, delay: Duration) -> Self {
        self.capture_delay = delay;
        self
    }

    /// Shared view of the calls, usable after the surface is boxed away
    pub fn record(&self) -> Arc<Mutex<SurfaceRecord>> {
        Arc::clone(&self.record)
    }

    fn update(&self, f: impl FnOnce(&mut SurfaceRecord)) {
        if let Ok(mut record) = self.record.lock() {
            f(&mut record);
        }
    }
}

impl Default for MockFrameSurface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameSurfacePort for MockFrameSurface {
    async fn attach(&mut self, source: &MediaSource) -> Result<(), DomainError> {
        if self.attached == Some(source.id()) {
            return Ok(());
        }
        self.attached = Some(source.id());
        self.position = 0.0;
        let name = source.name().to_string();
        self.update(|r| r.attached.push(name));
        Ok(())
    }

    async fn seek(&mut self, timestamp: f64) -> Result<(), DomainError> {
        if self.attached.is_none() {
            return Err(DomainError::CaptureError("no source attached".to_string()));
        }
        self.position = timestamp;
        self.update(|r| r.seeks.push(timestamp));
        Ok(())
    }

    async fn capture(&mut self, width: u32, height: u32) -> Result<RasterImage, DomainError> {
        if self.attached.is_none() {
            return Err(DomainError::CaptureError("no source attached".to_string()));
        }
        if !self.capture_delay.is_zero() {
            tokio::time::sleep(self.capture_delay).await;
        }
        self.update(|r| r.captures += 1);
        let shade = (self.position.clamp(0.0, 255.0)) as u8;
        let pixels = [shade, 0, 0].repeat(width as usize * height as usize);
        RasterImage::from_rgb(width, height, pixels)
    }

    async fn detach(&mut self) {
        self.attached = None;
        self.update(|r| r.detaches += 1);
    }
}

/// Delivery adapter that keeps artifacts in memory
#[derive(Default)]
pub struct MemoryDeliveryAdapter {
    delivered: Mutex<Vec<Artifact>>,
    failure: Option<String>,
}

impl MemoryDeliveryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            failure: Some(reason.to_string()),
        }
    }

    pub fn delivered(&self) -> Vec<Artifact> {
        self.delivered
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DeliveryPort for MemoryDeliveryAdapter {
    async fn deliver(&self, artifact: &Artifact) -> Result<DeliveryReceipt, DomainError> {
        if let Some(reason) = &self.failure {
            return Err(DomainError::DeliveryError(reason.clone()));
        }
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push(artifact.clone());
        }
        Ok(DeliveryReceipt {
            location: format!("memory://{}", artifact.suggested_name),
            bytes_written: artifact.bytes.len() as u64,
        })
    }
}
