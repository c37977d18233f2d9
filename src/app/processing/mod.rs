// Processing interactor - Orchestrates trim and merge jobs over the engine session

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::app::engine_session::{EngineSession, ProgressCallback};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;

pub const LOAD_FAILED: &str = "failed to load engine";
pub const STAGE_FAILED: &str = "failed to stage input";
pub const TRIM_FAILED: &str = "failed to trim video";
pub const MERGE_FAILED: &str = "failed to merge videos - check that sources share format/codecs";
pub const RETRIEVE_FAILED: &str = "failed to retrieve output";
pub const DELIVER_FAILED: &str = "failed to deliver output";

/// Result of a completed job
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub artifact_name: String,
    pub size: u64,
    pub receipt: DeliveryReceipt,
    pub produced_at: DateTime<Utc>,
}

struct JobFailure {
    message: &'static str,
    error: DomainError,
}

impl JobFailure {
    fn at(message: &'static str) -> impl FnOnce(DomainError) -> Self {
        move |error| Self { message, error }
    }
}

/// Interactor for the trim and merge use cases
///
/// Holds the single processing job. Observers follow it through
/// `subscribe`; a commit while a job is processing, or before a failed job
/// is reset, is rejected with a `PreconditionError`.
pub struct ProcessingInteractor {
    session: Arc<EngineSession>,
    delivery_port: Arc<dyn DeliveryPort>,
    probe_port: Option<Arc<dyn ProbePort>>,
    log_port: Arc<dyn LogPort>,
    preflight: MergePreflight,
    job: Arc<watch::Sender<ProcessingJob>>,
}

impl ProcessingInteractor {
    /// Create new processing interactor with injected ports
    pub fn new(
        session: Arc<EngineSession>,
        delivery_port: Arc<dyn DeliveryPort>,
        log_port: Arc<dyn LogPort>,
    ) -> Self {
        let (job, _) = watch::channel(ProcessingJob::idle());
        Self {
            session,
            delivery_port,
            probe_port: None,
            log_port,
            preflight: MergePreflight::Off,
            job: Arc::new(job),
        }
    }

    /// Enable the merge compatibility check
    pub fn with_preflight(mut self, probe_port: Arc<dyn ProbePort>, policy: MergePreflight) -> Self {
        self.probe_port = Some(probe_port);
        self.preflight = policy;
        self
    }

    /// Snapshot of the current job
    pub fn job(&self) -> ProcessingJob {
        self.job.borrow().clone()
    }

    /// Follow job state changes
    pub fn subscribe(&self) -> watch::Receiver<ProcessingJob> {
        self.job.subscribe()
    }

    /// Load the engine session, reporting a failure on the job
    pub async fn load_engine(&self) -> Result<(), DomainError> {
        let result = self.session.load().await;
        if let Err(DomainError::LoadError(reason)) = &result {
            self.record_load_failure(reason);
            self.log_port
                .error(&format!("{}: {}", LOAD_FAILED, reason))
                .await;
        }
        result
    }

    /// Acknowledge a completed or failed job
    pub fn reset(&self) -> Result<(), DomainError> {
        let mut outcome = Ok(());
        self.job.send_if_modified(|job| match job.reset() {
            Ok(()) => true,
            Err(e) => {
                outcome = Err(e);
                false
            }
        });
        outcome
    }

    /// Cut `range` out of `source` and deliver it as `trimmed-<name>`
    pub async fn commit_trim(
        &self,
        source: &MediaSource,
        range: &TrimRange,
    ) -> Result<JobOutcome, DomainError> {
        self.require_ready()?;
        let plan = TrimCommandBuilder::build(range)?;
        self.begin(JobKind::Trim)?;

        self.log_port
            .log_event(
                &LogEvent::new(LogLevel::Info, "Trim started")
                    .with("source", source.name())
                    .with("start", range.start())
                    .with("end", range.end()),
            )
            .await;

        let artifact_name = TrimCommandBuilder::artifact_name(source.name());
        let result = self.run_trim(source, &plan, &artifact_name).await;

        let staged = vec![plan.input_name.clone(), plan.output_name.clone()];
        self.finish(JobKind::Trim, staged, result).await
    }

    /// Concatenate the sequence in order and deliver it as `merged-video.mp4`
    pub async fn commit_merge(&self, sequence: &MergeSequence) -> Result<JobOutcome, DomainError> {
        self.require_ready()?;
        let plan = MergeCommandBuilder::build(sequence)?;
        self.check_compatibility(sequence).await?;
        self.begin(JobKind::Merge)?;

        self.log_port
            .log_event(
                &LogEvent::new(LogLevel::Info, "Merge started").with("sources", sequence.len()),
            )
            .await;

        let result = self.run_merge(sequence, &plan).await;

        let mut staged = plan.input_names.clone();
        staged.push(plan.manifest_name.clone());
        staged.push(plan.output_name.clone());
        self.finish(JobKind::Merge, staged, result).await
    }

    async fn run_trim(
        &self,
        source: &MediaSource,
        plan: &TrimPlan,
        artifact_name: &str,
    ) -> Result<JobOutcome, JobFailure> {
        let bytes = source.read_bytes().await.map_err(JobFailure::at(STAGE_FAILED))?;
        self.session
            .stage(&plan.input_name, &bytes)
            .await
            .map_err(JobFailure::at(STAGE_FAILED))?;
        drop(bytes);

        self.execute_tracked(&plan.args)
            .await
            .map_err(JobFailure::at(TRIM_FAILED))?;

        self.retrieve_and_deliver(&plan.output_name, artifact_name).await
    }

    async fn run_merge(
        &self,
        sequence: &MergeSequence,
        plan: &MergePlan,
    ) -> Result<JobOutcome, JobFailure> {
        // Inputs in sequence order, then the manifest that references them
        for (source, name) in sequence.sources().iter().zip(&plan.input_names) {
            let bytes = source.read_bytes().await.map_err(JobFailure::at(STAGE_FAILED))?;
            self.session
                .stage(name, &bytes)
                .await
                .map_err(JobFailure::at(STAGE_FAILED))?;
        }
        self.session
            .stage(&plan.manifest_name, plan.manifest.as_bytes())
            .await
            .map_err(JobFailure::at(STAGE_FAILED))?;

        self.execute_tracked(&plan.args)
            .await
            .map_err(JobFailure::at(MERGE_FAILED))?;

        self.retrieve_and_deliver(&plan.output_name, MERGED_ARTIFACT_NAME)
            .await
    }

    /// Execute with job progress following the engine for exactly this command
    async fn execute_tracked(&self, args: &[String]) -> Result<(), DomainError> {
        let job = Arc::clone(&self.job);
        let callback: ProgressCallback = Arc::new(move |fraction: f64| {
            job.send_if_modified(|job| job.set_progress(fraction * 100.0));
        });
        let subscription = self.session.subscribe_progress(callback);
        let result = self.session.execute(args).await;
        subscription.detach();
        result.map(|_| ())
    }

    async fn retrieve_and_deliver(
        &self,
        output_name: &str,
        artifact_name: &str,
    ) -> Result<JobOutcome, JobFailure> {
        let bytes = self
            .session
            .retrieve(output_name)
            .await
            .map_err(JobFailure::at(RETRIEVE_FAILED))?;
        if bytes.is_empty() {
            return Err(JobFailure {
                message: RETRIEVE_FAILED,
                error: DomainError::RetrievalError(format!("{} is empty", output_name)),
            });
        }

        let artifact = Artifact::new(bytes, artifact_name, OUTPUT_MIME_TYPE);
        let receipt = self
            .delivery_port
            .deliver(&artifact)
            .await
            .map_err(JobFailure::at(DELIVER_FAILED))?;

        Ok(JobOutcome {
            artifact_name: artifact.suggested_name,
            size: artifact.bytes.len() as u64,
            receipt,
            produced_at: artifact.produced_at,
        })
    }

    async fn finish(
        &self,
        kind: JobKind,
        staged: Vec<String>,
        result: Result<JobOutcome, JobFailure>,
    ) -> Result<JobOutcome, DomainError> {
        for name in staged {
            if let Err(e) = self.session.discard(&name).await {
                self.log_port
                    .debug(&format!("Could not discard {}: {}", name, e))
                    .await;
            }
        }

        match result {
            Ok(outcome) => {
                self.job.send_modify(|job| job.complete());
                self.log_port
                    .log_event(
                        &LogEvent::new(LogLevel::Info, format!("{:?} completed", kind))
                            .with("artifact", &outcome.artifact_name)
                            .with("bytes", outcome.size)
                            .with("location", &outcome.receipt.location)
                            .with("produced_at", outcome.produced_at.to_rfc3339()),
                    )
                    .await;
                Ok(outcome)
            }
            Err(failure) => {
                self.job.send_modify(|job| job.fail(failure.message));
                self.log_port
                    .error(&format!("{}: {}", failure.message, failure.error))
                    .await;
                if let Some(diagnostics) = failure.error.diagnostics() {
                    self.log_port.debug(diagnostics).await;
                }
                Err(failure.error)
            }
        }
    }

    fn require_ready(&self) -> Result<(), DomainError> {
        let state = self.session.state();
        if let EngineState::Faulted(reason) = &state {
            self.record_load_failure(reason);
        }
        if state.is_ready() {
            Ok(())
        } else {
            Err(DomainError::PreconditionError(format!(
                "engine is not ready ({})",
                state
            )))
        }
    }

    fn record_load_failure(&self, reason: &str) {
        let message = format!("{}: {}", LOAD_FAILED, reason);
        self.job.send_if_modified(|job| job.fault(message));
    }

    fn begin(&self, kind: JobKind) -> Result<(), DomainError> {
        let mut outcome = Ok(());
        self.job.send_if_modified(|job| match job.begin(kind) {
            Ok(()) => true,
            Err(e) => {
                outcome = Err(e);
                false
            }
        });
        outcome
    }

    async fn check_compatibility(&self, sequence: &MergeSequence) -> Result<(), DomainError> {
        let Some(probe_port) = self.probe_port.as_ref() else {
            return Ok(());
        };
        if self.preflight == MergePreflight::Off {
            return Ok(());
        }

        let mut probes = Vec::with_capacity(sequence.len());
        for source in sequence.sources() {
            match probe_port.probe_media(source).await {
                Ok(probe) => probes.push((source.name().to_string(), probe)),
                Err(e) if self.preflight == MergePreflight::Reject => {
                    return Err(DomainError::PreconditionError(format!(
                        "cannot verify merge compatibility: {}",
                        e
                    )))
                }
                Err(e) => {
                    self.log_port
                        .warn(&format!("Skipping compatibility check: {}", e))
                        .await;
                    return Ok(());
                }
            }
        }

        let mismatches = CompatibilityChecker::check(&probes);
        if mismatches.is_empty() {
            return Ok(());
        }
        for mismatch in &mismatches {
            self.log_port.warn(mismatch).await;
        }
        match self.preflight {
            MergePreflight::Reject => Err(DomainError::PreconditionError(format!(
                "sources are not stream-copy compatible: {}",
                mismatches.join("; ")
            ))),
            _ => Ok(()),
        }
    }
}
