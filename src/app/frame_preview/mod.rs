// Frame preview - Sequential seek-and-capture over a shared decode surface

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::PreviewSchedule;
use crate::ports::*;

type SharedSurface = Arc<tokio::sync::Mutex<Box<dyn FrameSurfacePort>>>;

/// Produces preview frames for scrub tooltips and timeline strips
///
/// At most one request is live: starting a new one cancels the previous
/// sequence, which then stops before its next seek.
pub struct FramePreviewer {
    surface: SharedSurface,
    width: u32,
    height: u32,
    current: Mutex<Option<Arc<AtomicBool>>>,
}

impl FramePreviewer {
    pub fn new(surface: Box<dyn FrameSurfacePort>, width: u32, height: u32) -> Self {
        Self {
            surface: Arc::new(tokio::sync::Mutex::new(surface)),
            width,
            height,
            current: Mutex::new(None),
        }
    }

    /// `count` frames evenly spaced over `[0, duration)`
    pub fn timeline(
        &self,
        source: &MediaSource,
        duration: f64,
        count: usize,
    ) -> Result<FrameSequence, DomainError> {
        let stamps = PreviewSchedule::strip(duration, count)?;
        Ok(self.start(source, stamps))
    }

    /// A single frame at `at`, clamped into the media
    pub async fn scrub(
        &self,
        source: &MediaSource,
        duration: f64,
        at: f64,
    ) -> Result<PreviewFrame, DomainError> {
        let stamp = PreviewSchedule::scrub(duration, at)?;
        let mut sequence = self.start(source, vec![stamp]);
        match sequence.next().await {
            Some(frame) => frame,
            None => Err(DomainError::Cancelled("scrub preview superseded".to_string())),
        }
    }

    /// Cancel the live request, if any
    pub fn cancel(&self) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(flag) = current.take() {
                flag.store(true, Ordering::SeqCst);
            }
        }
    }

    /// Cancel the live request and let the surface drop what it holds
    pub async fn release(&self) {
        self.cancel();
        self.surface.lock().await.detach().await;
    }

    fn start(&self, source: &MediaSource, stamps: Vec<f64>) -> FrameSequence {
        let cancelled = Arc::new(AtomicBool::new(false));
        if let Ok(mut current) = self.current.lock() {
            if let Some(previous) = current.replace(Arc::clone(&cancelled)) {
                previous.store(true, Ordering::SeqCst);
                debug!("Superseded in-flight preview request");
            }
        }

        FrameSequence {
            surface: Arc::clone(&self.surface),
            source: source.clone(),
            stamps,
            next_index: 0,
            width: self.width,
            height: self.height,
            cancelled,
            done: false,
        }
    }
}

/// Lazy, ordered, single-pass sequence of preview frames
///
/// Each step seeks the shared surface and waits for it to settle before
/// capturing. Cancellation is checked between steps, never mid-seek.
pub struct FrameSequence {
    surface: SharedSurface,
    source: MediaSource,
    stamps: Vec<f64>,
    next_index: usize,
    width: u32,
    height: u32,
    cancelled: Arc<AtomicBool>,
    done: bool,
}

impl FrameSequence {
    /// Timestamps this sequence visits, in order
    pub fn timestamps(&self) -> &[f64] {
        &self.stamps
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Stop before the next seek
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Next frame; a cancelled sequence yields one `Cancelled` error and then ends
    pub async fn next(&mut self) -> Option<Result<PreviewFrame, DomainError>> {
        if self.done {
            return None;
        }
        if self.is_cancelled() {
            return Some(Err(self.superseded()));
        }
        let Some(&timestamp) = self.stamps.get(self.next_index) else {
            self.done = true;
            return None;
        };

        let result = {
            let mut surface = self.surface.lock().await;
            // Another request may have taken the surface while we waited
            if self.is_cancelled() {
                None
            } else {
                Some(self.capture_at(&mut **surface, timestamp).await)
            }
        };

        match result {
            None => Some(Err(self.superseded())),
            Some(Ok(image)) => {
                let index = self.next_index;
                self.next_index += 1;
                Some(Ok(PreviewFrame {
                    index,
                    timestamp,
                    image,
                }))
            }
            Some(Err(e)) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }

    /// Drain the sequence; partial results are discarded on cancellation or error
    pub async fn collect(mut self) -> Result<Vec<PreviewFrame>, DomainError> {
        let mut frames = Vec::with_capacity(self.stamps.len());
        while let Some(frame) = self.next().await {
            frames.push(frame?);
        }
        Ok(frames)
    }

    fn superseded(&mut self) -> DomainError {
        self.done = true;
        DomainError::Cancelled(format!(
            "preview of {} superseded after {} of {} frames",
            self.source.name(),
            self.next_index,
            self.stamps.len()
        ))
    }

    async fn capture_at(
        &self,
        surface: &mut dyn FrameSurfacePort,
        timestamp: f64,
    ) -> Result<RasterImage, DomainError> {
        surface.attach(&self.source).await?;
        surface.seek(timestamp).await?;
        surface.capture(self.width, self.height).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockFrameSurface;
    use std::time::Duration;

    fn source(name: &str) -> MediaSource {
        MediaSource::new(name, 2048, "video/mp4", format!("/tmp/{}", name))
    }

    #[tokio::test]
    async fn test_timeline_yields_frames_in_order() {
        let surface = MockFrameSurface::new();
        let record = surface.record();
        let previewer = FramePreviewer::new(Box::new(surface), 100, 60);

        let frames = previewer
            .timeline(&source("a.mp4"), 120.0, 12)
            .unwrap()
            .collect()
            .await
            .unwrap();

        assert_eq!(frames.len(), 12);
        assert_eq!(frames[3].index, 3);
        assert_eq!(frames[3].timestamp, 30.0);
        assert_eq!(frames[0].image.pixels.len(), 100 * 60 * 3);

        let record = record.lock().unwrap();
        assert_eq!(record.seeks.len(), 12);
        assert!(record.seeks.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(record.attached, vec!["a.mp4".to_string()]);
    }

    #[tokio::test]
    async fn test_sequence_is_lazy() {
        let surface = MockFrameSurface::new();
        let record = surface.record();
        let previewer = FramePreviewer::new(Box::new(surface), 10, 10);

        let mut sequence = previewer.timeline(&source("a.mp4"), 60.0, 6).unwrap();
        assert_eq!(sequence.timestamps(), &[0.0, 10.0, 20.0, 30.0, 40.0, 50.0]);
        assert_eq!(record.lock().unwrap().captures, 0);

        let first = sequence.next().await.unwrap().unwrap();
        assert_eq!(first.timestamp, 0.0);
        assert_eq!(record.lock().unwrap().captures, 1);
    }

    #[tokio::test]
    async fn test_new_request_cancels_previous() {
        let surface = MockFrameSurface::new();
        let record = surface.record();
        let previewer = FramePreviewer::new(Box::new(surface), 10, 10);

        let mut old = previewer.timeline(&source("a.mp4"), 60.0, 6).unwrap();
        old.next().await.unwrap().unwrap();

        let fresh = previewer.timeline(&source("b.mp4"), 30.0, 3).unwrap();
        assert!(old.is_cancelled());
        assert!(matches!(
            old.next().await,
            Some(Err(DomainError::Cancelled(_)))
        ));
        assert!(old.next().await.is_none());

        let frames = fresh.collect().await.unwrap();
        assert_eq!(frames.len(), 3);

        // One seek for the cancelled strip, three for the new one
        assert_eq!(record.lock().unwrap().seeks, vec![0.0, 0.0, 10.0, 20.0]);
    }

    #[tokio::test]
    async fn test_cancel_between_steps_discards_partial_results() {
        let surface = MockFrameSurface::new().with_capture_delay(Duration::from_millis(20));
        let previewer = Arc::new(FramePreviewer::new(Box::new(surface), 10, 10));

        let sequence = previewer.timeline(&source("a.mp4"), 120.0, 12).unwrap();
        let task = tokio::spawn(sequence.collect());
        tokio::time::sleep(Duration::from_millis(50)).await;
        previewer.cancel();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(DomainError::Cancelled(_))));
    }

    #[tokio::test]
    async fn test_scrub_clamps_to_duration() {
        let surface = MockFrameSurface::new();
        let record = surface.record();
        let previewer = FramePreviewer::new(Box::new(surface), 10, 10);

        let frame = previewer.scrub(&source("a.mp4"), 40.0, 95.0).await.unwrap();
        assert_eq!(frame.timestamp, 40.0);
        assert_eq!(record.lock().unwrap().seeks, vec![40.0]);
    }

    #[tokio::test]
    async fn test_release_detaches_surface() {
        let surface = MockFrameSurface::new();
        let record = surface.record();
        let previewer = FramePreviewer::new(Box::new(surface), 10, 10);

        previewer.scrub(&source("a.mp4"), 10.0, 5.0).await.unwrap();
        previewer.release().await;
        assert_eq!(record.lock().unwrap().detaches, 1);
    }

    #[test]
    fn test_invalid_requests_are_rejected() {
        let previewer = FramePreviewer::new(Box::new(MockFrameSurface::new()), 10, 10);
        assert!(previewer.timeline(&source("a.mp4"), 0.0, 12).is_err());
        assert!(previewer.timeline(&source("a.mp4"), 10.0, 0).is_err());
    }
}
