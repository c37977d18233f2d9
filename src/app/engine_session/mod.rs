// Engine session - Lifecycle and primitives of the transcoding engine

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use tokio::sync::{mpsc, OnceCell};
use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Callback receiving the completed fraction of the running command
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// The one engine session of an application run
///
/// Construct it once at startup and share it through an `Arc`. The engine
/// filesystem and the progress stream are global to the session, so commands
/// are serialized: only one `execute` is ever in flight.
pub struct EngineSession {
    engine: Arc<dyn TranscodeEnginePort>,
    state: RwLock<EngineState>,
    load_outcome: OnceCell<Result<(), DomainError>>,
    exec_lock: tokio::sync::Mutex<()>,
    progress: Arc<ProgressHub>,
    last_log_line: Mutex<Option<String>>,
}

/// Output of a successful command
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub log: Vec<String>,
}

impl EngineSession {
    pub fn new(engine: Arc<dyn TranscodeEnginePort>) -> Self {
        Self {
            engine,
            state: RwLock::new(EngineState::Uninitialized),
            load_outcome: OnceCell::new(),
            exec_lock: tokio::sync::Mutex::new(()),
            progress: Arc::new(ProgressHub::default()),
            last_log_line: Mutex::new(None),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.state
            .read()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Latest line the engine logged, for status display
    pub fn last_log_line(&self) -> Option<String> {
        self.last_log_line.lock().ok().and_then(|line| line.clone())
    }

    /// Initialize the engine
    ///
    /// Concurrent and repeated calls share the outcome of a single attempt. A
    /// failure leaves the session `Faulted` for good.
    pub async fn load(&self) -> Result<(), DomainError> {
        self.load_outcome
            .get_or_init(|| async {
                self.set_state(EngineState::Loading);
                info!("Loading transcoding engine");
                match self.engine.load().await {
                    Ok(()) => {
                        self.set_state(EngineState::Ready);
                        info!("Transcoding engine ready");
                        Ok(())
                    }
                    Err(fault) => {
                        let reason = fault.to_string();
                        warn!(%reason, "Transcoding engine failed to load");
                        self.set_state(EngineState::Faulted(reason.clone()));
                        Err(DomainError::LoadError(reason))
                    }
                }
            })
            .await
            .clone()
    }

    /// Write a payload into the engine filesystem
    pub async fn stage(&self, name: &str, bytes: &[u8]) -> Result<(), DomainError> {
        self.ensure_ready(DomainError::StagingError)?;
        debug!(name, bytes = bytes.len(), "Staging engine input");
        self.engine
            .write_file(name, bytes)
            .await
            .map_err(|fault| DomainError::StagingError(format!("{}: {}", name, fault)))
    }

    /// Run one command against the staged filesystem
    pub async fn execute(&self, args: &[String]) -> Result<ExecutionReport, DomainError> {
        self.ensure_ready(|message| DomainError::ExecutionError {
            message,
            diagnostics: String::new(),
        })?;

        let _guard = self.exec_lock.lock().await;
        info!(args = %args.join(" "), "Executing engine command");
        self.progress.begin_execution();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut log = Vec::new();
        let run = self.engine.exec(args, tx);
        tokio::pin!(run);

        let outcome = loop {
            tokio::select! {
                outcome = &mut run => break outcome,
                Some(event) = rx.recv() => self.dispatch(event, &mut log),
            }
        };
        while let Ok(event) = rx.try_recv() {
            self.dispatch(event, &mut log);
        }

        match outcome {
            Ok(0) => {
                self.progress.publish(1.0);
                Ok(ExecutionReport { log })
            }
            Ok(code) => Err(DomainError::ExecutionError {
                message: format!("engine exited with code {}", code),
                diagnostics: log.join("\n"),
            }),
            Err(fault) => Err(DomainError::ExecutionError {
                message: fault.to_string(),
                diagnostics: log.join("\n"),
            }),
        }
    }

    /// Read a named output back out of the engine filesystem
    pub async fn retrieve(&self, name: &str) -> Result<Vec<u8>, DomainError> {
        self.ensure_ready(DomainError::RetrievalError)?;
        self.engine
            .read_file(name)
            .await
            .map_err(|fault| DomainError::RetrievalError(fault.to_string()))
    }

    /// Drop a file from the engine filesystem
    pub async fn discard(&self, name: &str) -> Result<(), DomainError> {
        self.ensure_ready(DomainError::FsFail)?;
        self.engine
            .delete_file(name)
            .await
            .map_err(|fault| DomainError::FsFail(format!("{}: {}", name, fault)))
    }

    /// Receive progress of every following command until the handle is dropped
    ///
    /// There is one subscriber slot; subscribing again replaces the previous
    /// subscriber, whose handle then detaches nothing.
    pub fn subscribe_progress(&self, callback: ProgressCallback) -> ProgressSubscription {
        let id = self.progress.attach(callback);
        ProgressSubscription {
            id,
            hub: Arc::downgrade(&self.progress),
        }
    }

    fn dispatch(&self, event: EngineEvent, log: &mut Vec<String>) {
        match event {
            EngineEvent::Log(line) => {
                debug!(target: "videostudio::engine", "{}", line);
                if let Ok(mut last) = self.last_log_line.lock() {
                    *last = Some(line.clone());
                }
                log.push(line);
            }
            EngineEvent::Progress(fraction) => self.progress.publish(fraction),
        }
    }

    fn ensure_ready(&self, error: impl FnOnce(String) -> DomainError) -> Result<(), DomainError> {
        let state = self.state();
        if state.is_ready() {
            Ok(())
        } else {
            Err(error(format!("engine is not ready ({})", state)))
        }
    }

    fn set_state(&self, state: EngineState) {
        match self.state.write() {
            Ok(mut current) => *current = state,
            Err(poisoned) => *poisoned.into_inner() = state,
        }
    }
}

/// Handle of the active progress subscriber; dropping it detaches the callback
pub struct ProgressSubscription {
    id: u64,
    hub: Weak<ProgressHub>,
}

impl ProgressSubscription {
    /// Stop receiving progress
    pub fn detach(self) {}
}

impl Drop for ProgressSubscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.detach(self.id);
        }
    }
}

#[derive(Default)]
struct ProgressHub {
    next_id: AtomicU64,
    subscriber: Mutex<Option<(u64, ProgressCallback)>>,
    last: Mutex<f64>,
}

impl ProgressHub {
    fn attach(&self, callback: ProgressCallback) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        if let Ok(mut slot) = self.subscriber.lock() {
            if slot.is_some() {
                debug!("Replacing progress subscriber");
            }
            *slot = Some((id, callback));
        }
        id
    }

    fn detach(&self, id: u64) {
        if let Ok(mut slot) = self.subscriber.lock() {
            if matches!(slot.as_ref(), Some((current, _)) if *current == id) {
                *slot = None;
            }
        }
    }

    fn begin_execution(&self) {
        if let Ok(mut last) = self.last.lock() {
            *last = 0.0;
        }
    }

    /// Forward a fraction, never letting it go backwards within one execution
    fn publish(&self, fraction: f64) {
        if fraction.is_nan() {
            return;
        }
        let value = match self.last.lock() {
            Ok(mut last) => {
                let value = fraction.clamp(0.0, 1.0).max(*last);
                if value == *last && value != 0.0 {
                    return;
                }
                *last = value;
                value
            }
            Err(_) => return,
        };

        let callback = self
            .subscriber
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|(_, cb)| Arc::clone(cb)));
        if let Some(callback) = callback {
            callback(value);
        }
    }
}
