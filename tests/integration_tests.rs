use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use videostudio::adapters::mock::{
    ExecScript, MemoryDeliveryAdapter, MockEngineAdapter, MockFrameSurface, MockProbeAdapter,
};
use videostudio::adapters::{StudioConfig, TracingLogAdapter};
use videostudio::app::{AppContainer, ContainerPorts};
use videostudio::domain::rules::{MergePreflight, MERGE_OUTPUT_NAME, TRIM_OUTPUT_NAME};
use videostudio::*;

/// Test utilities for editing workflows
mod test_utils {
    use super::*;

    pub struct Harness {
        pub container: DefaultAppContainer,
        pub engine: Arc<MockEngineAdapter>,
        pub delivery: Arc<MemoryDeliveryAdapter>,
        pub dir: TempDir,
    }

    pub fn harness(engine: MockEngineAdapter, config: StudioConfig) -> Harness {
        let engine = Arc::new(engine);
        let delivery = Arc::new(MemoryDeliveryAdapter::new());
        let ports = ContainerPorts {
            engine: engine.clone(),
            probe: Arc::new(
                MockProbeAdapter::new().with_fallback(MockProbeAdapter::h264_probe(120.0)),
            ),
            surface: Box::new(MockFrameSurface::new()),
            delivery: delivery.clone(),
            log: Arc::new(TracingLogAdapter::new()),
        };
        Harness {
            container: DefaultAppContainer::with_ports(&config, ports),
            engine,
            delivery,
            dir: TempDir::new().unwrap(),
        }
    }

    /// Write a placeholder clip the collector accepts
    pub fn clip(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// True when real ffmpeg and ffprobe binaries are on PATH
    pub fn ffmpeg_available() -> bool {
        ["ffmpeg", "ffprobe"].iter().all(|bin| {
            std::process::Command::new(bin)
                .arg("-version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        })
    }

    /// Create a test video file using FFmpeg
    pub fn create_test_video(output_path: &Path, duration: f64) {
        let output = std::process::Command::new("ffmpeg")
            .args([
                "-hide_banner",
                "-f",
                "lavfi",
                "-i",
                "testsrc=size=320x240:rate=25",
                "-f",
                "lavfi",
                "-i",
                "sine=frequency=1000",
                "-c:v",
                "mpeg4",
                "-g",
                "25",
                "-c:a",
                "aac",
                "-t",
                &duration.to_string(),
                "-y",
            ])
            .arg(output_path)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "ffmpeg failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

use test_utils::*;

#[tokio::test]
async fn test_trim_workflow_through_container() {
    let engine = MockEngineAdapter::new().with_script(
        ExecScript::success(TRIM_OUTPUT_NAME, b"cut".to_vec()).with_progress(vec![0.4, 0.8]),
    );
    let h = harness(engine, StudioConfig::default());
    let path = clip(h.dir.path(), "holiday.mp4", b"original");

    let sources = h.container.upload_collector(false).collect(&[path]).await.unwrap();
    let source = &sources[0];
    let probe = h.container.probe_port().probe_media(source).await.unwrap();

    // Default range covers the whole clip; a drag past the end marker clamps
    let range = TrimRange::new(probe.duration).unwrap().with_start(119.7);
    assert_eq!((range.start(), range.end()), (119.0, 120.0));

    let range = range.with_start(10.0).with_end(25.0);
    h.container.engine_session().load().await.unwrap();
    let outcome = h
        .container
        .processing_interactor()
        .commit_trim(source, &range)
        .await
        .unwrap();

    assert_eq!(outcome.artifact_name, "trimmed-holiday.mp4");
    assert_eq!(outcome.receipt.location, "memory://trimmed-holiday.mp4");
    assert_eq!(h.engine.file("input.mp4"), None);
    assert_eq!(h.delivery.delivered()[0].bytes, b"cut");
}

#[tokio::test]
async fn test_merge_workflow_respects_reordering() {
    let h = harness(
        MockEngineAdapter::new()
            .with_script(ExecScript::success(MERGE_OUTPUT_NAME, b"joined".to_vec())),
        StudioConfig::default(),
    );
    let paths = vec![
        clip(h.dir.path(), "intro.mp4", b"I"),
        clip(h.dir.path(), "talk.mp4", b"TT"),
        clip(h.dir.path(), "outro.mp4", b"OOO"),
    ];
    let sources = h.container.upload_collector(true).collect(&paths).await.unwrap();

    // Outro dragged to the front; the other two keep their relative order
    let sequence = MergeSequence::from_sources(sources)
        .unwrap()
        .moved(2, 0)
        .unwrap();
    let names: Vec<&str> = sequence.sources().iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["outro.mp4", "intro.mp4", "talk.mp4"]);

    h.container.engine_session().load().await.unwrap();
    let interactor = h.container.processing_interactor();

    let outcome = interactor.commit_merge(&sequence).await.unwrap();
    assert_eq!(outcome.artifact_name, "merged-video.mp4");
    assert_eq!(
        h.engine.written_names(),
        vec!["input0.mp4", "input1.mp4", "input2.mp4", "list.txt"]
    );
    assert_eq!(h.engine.written("input0.mp4").unwrap(), b"OOO");
    assert_eq!(h.engine.written("input2.mp4").unwrap(), b"TT");
    assert_eq!(
        h.engine.written("list.txt").unwrap(),
        b"file 'input0.mp4'\nfile 'input1.mp4'\nfile 'input2.mp4'\n"
    );
    assert_eq!(interactor.job().status, JobStatus::Completed);
}

#[tokio::test]
async fn test_failed_merge_reports_engine_log() {
    let engine = MockEngineAdapter::new().with_script(ExecScript::exit(
        1,
        vec!["Non-monotonous DTS in output stream".to_string()],
    ));
    let h = harness(engine, StudioConfig::default());
    let paths = vec![
        clip(h.dir.path(), "a.mp4", b"A"),
        clip(h.dir.path(), "b.mp4", b"B"),
    ];
    let sources = h.container.upload_collector(true).collect(&paths).await.unwrap();
    let sequence = MergeSequence::from_sources(sources).unwrap();

    h.container.engine_session().load().await.unwrap();
    let interactor = h.container.processing_interactor();
    let err = interactor.commit_merge(&sequence).await.unwrap_err();

    assert!(matches!(err, DomainError::ExecutionError { .. }));
    assert_eq!(
        h.container.engine_session().last_log_line().as_deref(),
        Some("Non-monotonous DTS in output stream")
    );
    // Failed jobs leave nothing behind in the engine filesystem either
    assert!(h.engine.file_names().is_empty());
    assert!(h.delivery.delivered().is_empty());

    let job = interactor.job();
    assert_eq!(job.status, JobStatus::Error);
    assert!(job
        .error_message
        .as_deref()
        .is_some_and(|m| m.starts_with("failed to merge videos")));
}

#[tokio::test]
async fn test_engine_load_failure_blocks_jobs() {
    let h = harness(
        MockEngineAdapter::new().failing_load("wasm core fetch failed"),
        StudioConfig::default(),
    );
    let path = clip(h.dir.path(), "a.mp4", b"A");
    let source = MediaSource::open(&path).await.unwrap();

    let session = h.container.engine_session();
    assert!(matches!(
        session.load().await,
        Err(DomainError::LoadError(_))
    ));
    assert!(matches!(session.state(), EngineState::Faulted(_)));

    let interactor = h.container.processing_interactor();
    let err = interactor
        .commit_trim(&source, &TrimRange::new(30.0).unwrap())
        .await
        .unwrap_err();
    assert!(err.is_precondition());
    assert!(h.engine.written_names().is_empty());

    let job = interactor.job();
    assert_eq!(job.status, JobStatus::Error);
    assert!(job
        .error_message
        .as_deref()
        .is_some_and(|m| m.starts_with("failed to load engine") && m.contains("wasm core fetch failed")));
}

#[tokio::test]
async fn test_preflight_policy_comes_from_config() {
    let engine = MockEngineAdapter::new()
        .with_script(ExecScript::success(MERGE_OUTPUT_NAME, b"joined".to_vec()));
    let engine = Arc::new(engine);
    let mut vp9 = MockProbeAdapter::h264_probe(5.0);
    if let Some(video) = vp9.video.as_mut() {
        video.codec = "vp9".to_string();
    }
    let config = StudioConfig {
        merge_preflight: MergePreflight::Reject,
        ..StudioConfig::default()
    };
    let ports = ContainerPorts {
        engine: engine.clone(),
        probe: Arc::new(
            MockProbeAdapter::new()
                .with_probe("b.webm", vp9)
                .with_fallback(MockProbeAdapter::h264_probe(5.0)),
        ),
        surface: Box::new(MockFrameSurface::new()),
        delivery: Arc::new(MemoryDeliveryAdapter::new()),
        log: Arc::new(TracingLogAdapter::new()),
    };
    let container = DefaultAppContainer::with_ports(&config, ports);

    let dir = TempDir::new().unwrap();
    let paths = vec![clip(dir.path(), "a.mp4", b"A"), clip(dir.path(), "b.webm", b"B")];
    let sources = container.upload_collector(true).collect(&paths).await.unwrap();
    let sequence = MergeSequence::from_sources(sources).unwrap();

    container.engine_session().load().await.unwrap();
    let err = container
        .processing_interactor()
        .commit_merge(&sequence)
        .await
        .unwrap_err();
    assert!(err.is_precondition());
    assert!(engine.executed().is_empty());
}

#[tokio::test]
async fn test_timeline_preview_through_container() {
    let config = StudioConfig {
        thumbnail_width: 16,
        thumbnail_height: 9,
        ..StudioConfig::default()
    };
    let h = harness(MockEngineAdapter::new(), config);
    let path = clip(h.dir.path(), "a.mp4", b"A");
    let source = MediaSource::open(&path).await.unwrap();

    let frames = h
        .container
        .frame_previewer()
        .timeline(&source, 120.0, 12)
        .unwrap()
        .collect()
        .await
        .unwrap();

    assert_eq!(frames.len(), 12);
    assert!(frames.iter().all(|f| f.image.width == 16 && f.image.height == 9));
    let stamps: Vec<f64> = frames.iter().map(|f| f.timestamp).collect();
    assert_eq!(stamps[..3], [0.0, 10.0, 20.0]);
}

#[tokio::test]
async fn test_real_ffmpeg_trim_and_merge() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg not available, skipping");
        return;
    }
    let work = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let first = work.path().join("first.mp4");
    let second = work.path().join("second.mp4");
    create_test_video(&first, 6.0);
    create_test_video(&second, 4.0);

    let config = StudioConfig {
        output_dir: out.path().to_path_buf(),
        ..StudioConfig::default()
    };
    let container = DefaultAppContainer::new(&config);
    container.engine_session().load().await.unwrap();

    let source = MediaSource::open(&first).await.unwrap();
    let probe = container.probe_port().probe_media(&source).await.unwrap();
    assert!((probe.duration - 6.0).abs() < 0.5);

    let range = TrimRange::new(probe.duration).unwrap().with_start(1.0).with_end(4.0);
    let interactor = container.processing_interactor();
    let trimmed = interactor.commit_trim(&source, &range).await.unwrap();
    assert!(Path::new(&trimmed.receipt.location).exists());
    assert!(trimmed.size > 0);

    let sources = container
        .upload_collector(true)
        .collect(&[first, second])
        .await
        .unwrap();
    let sequence = MergeSequence::from_sources(sources).unwrap();
    let merged = interactor.commit_merge(&sequence).await.unwrap();
    assert!(merged.receipt.location.ends_with("merged-video.mp4"));

    let merged_source = MediaSource::open(Path::new(&merged.receipt.location))
        .await
        .unwrap();
    let merged_probe = container
        .probe_port()
        .probe_media(&merged_source)
        .await
        .unwrap();
    assert!((merged_probe.duration - 10.0).abs() < 1.0);
}
