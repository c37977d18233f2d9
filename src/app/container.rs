use std::sync::Arc;

use crate::adapters::{
    FfmpegFrameSurface, FfmpegProcessEngine, FfprobeAdapter, FsDeliveryAdapter, StudioConfig,
    TracingLogAdapter,
};
use crate::app::{
    engine_session::EngineSession, frame_preview::FramePreviewer,
    processing::ProcessingInteractor, upload::UploadCollector,
};
use crate::ports::{
    DeliveryPort, FrameSurfacePort, LogLevel, LogPort, ProbePort, TranscodeEnginePort,
};

pub trait AppContainer: Send + Sync {
    fn engine_session(&self) -> Arc<EngineSession>;
    fn processing_interactor(&self) -> Arc<ProcessingInteractor>;
    fn frame_previewer(&self) -> Arc<FramePreviewer>;
    fn probe_port(&self) -> Arc<dyn ProbePort>;
    fn upload_collector(&self, multiple: bool) -> UploadCollector;
}

/// Ports the container wires together
pub struct ContainerPorts {
    pub engine: Arc<dyn TranscodeEnginePort>,
    pub probe: Arc<dyn ProbePort>,
    pub surface: Box<dyn FrameSurfacePort>,
    pub delivery: Arc<dyn DeliveryPort>,
    pub log: Arc<dyn LogPort>,
}

pub struct DefaultAppContainer {
    engine_session: Arc<EngineSession>,
    processing_interactor: Arc<ProcessingInteractor>,
    frame_previewer: Arc<FramePreviewer>,
    probe_port: Arc<dyn ProbePort>,
}

impl DefaultAppContainer {
    /// Wire the ffmpeg-backed adapters described by `config`
    pub fn new(config: &StudioConfig) -> Self {
        let level = LogLevel::parse(&config.log_level).unwrap_or(LogLevel::Info);
        let ports = ContainerPorts {
            engine: Arc::new(FfmpegProcessEngine::new(&config.ffmpeg_path)),
            probe: Arc::new(FfprobeAdapter::new(&config.ffprobe_path)),
            surface: Box::new(FfmpegFrameSurface::new(&config.ffmpeg_path)),
            delivery: Arc::new(FsDeliveryAdapter::new(&config.output_dir)),
            log: Arc::new(TracingLogAdapter::with_level(level)),
        };
        Self::with_ports(config, ports)
    }

    pub fn with_ports(config: &StudioConfig, ports: ContainerPorts) -> Self {
        let engine_session = Arc::new(EngineSession::new(ports.engine));

        let processing_interactor = Arc::new(
            ProcessingInteractor::new(
                Arc::clone(&engine_session),
                ports.delivery,
                Arc::clone(&ports.log),
            )
            .with_preflight(Arc::clone(&ports.probe), config.merge_preflight),
        );

        let frame_previewer = Arc::new(FramePreviewer::new(
            ports.surface,
            config.thumbnail_width,
            config.thumbnail_height,
        ));

        Self {
            engine_session,
            processing_interactor,
            frame_previewer,
            probe_port: ports.probe,
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn engine_session(&self) -> Arc<EngineSession> {
        Arc::clone(&self.engine_session)
    }

    fn processing_interactor(&self) -> Arc<ProcessingInteractor> {
        Arc::clone(&self.processing_interactor)
    }

    fn frame_previewer(&self) -> Arc<FramePreviewer> {
        Arc::clone(&self.frame_previewer)
    }

    fn probe_port(&self) -> Arc<dyn ProbePort> {
        Arc::clone(&self.probe_port)
    }

    fn upload_collector(&self, multiple: bool) -> UploadCollector {
        if multiple {
            UploadCollector::multiple()
        } else {
            UploadCollector::single()
        }
    }
}
