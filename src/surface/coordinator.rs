use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::broker::CaptureBroker;
use crate::config::CaptureConfig;
use crate::error::RecorderError;
use crate::platform::{CapturePlatform, MicSelector, TabId};
use crate::services::{Summarizer, Transcriber};
use crate::session::{LifecycleStatus, RecordingSession};
use crate::sink::ResultSink;
use crate::status::{StatusChannel, StatusSnapshot};

/// Reply to a successful start.
#[derive(Debug, Clone, Serialize)]
pub struct StartedRecording {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
}

/// Reply to stop. `finalized` is false for the idempotent no-op case.
#[derive(Debug, Clone, Serialize)]
pub struct StopOutcome {
    pub finalized: bool,
    pub blob_bytes: usize,
}

/// Transcript and summary of the completed recording.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingResult {
    pub transcript: String,
    pub summary: String,
}

/// One request from another context, dispatched by its discriminant.
enum SurfaceCommand {
    Start {
        tab_id: TabId,
        mic: MicSelector,
        label: Option<String>,
        reply: oneshot::Sender<Result<StartedRecording, RecorderError>>,
    },
    Stop {
        reply: oneshot::Sender<Result<StopOutcome, RecorderError>>,
    },
    Status {
        reply: oneshot::Sender<StatusSnapshot>,
    },
    Dismiss {
        reply: oneshot::Sender<Result<(), RecorderError>>,
    },
    NewRecording {
        reply: oneshot::Sender<Result<(), RecorderError>>,
    },
    Result {
        reply: oneshot::Sender<Result<RecordingResult, RecorderError>>,
    },
    /// Host-runtime eviction of the durable surface.
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Client side of the coordinator's command channel.
///
/// When the coordinator is gone, operations report `SurfaceGone` and status
/// resolves to Idle with a data-loss indication rather than a stale state.
#[derive(Clone)]
pub struct SurfaceHandle {
    tx: mpsc::Sender<SurfaceCommand>,
    status: StatusChannel,
}

impl SurfaceHandle {
    pub async fn start(
        &self,
        tab_id: TabId,
        mic: MicSelector,
        label: Option<String>,
    ) -> Result<StartedRecording, RecorderError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SurfaceCommand::Start {
                tab_id,
                mic,
                label,
                reply,
            })
            .await
            .map_err(|_| RecorderError::SurfaceGone)?;
        rx.await.map_err(|_| RecorderError::SurfaceGone)?
    }

    pub async fn stop(&self) -> Result<StopOutcome, RecorderError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SurfaceCommand::Stop { reply })
            .await
            .map_err(|_| RecorderError::SurfaceGone)?;
        rx.await.map_err(|_| RecorderError::SurfaceGone)?
    }

    /// Query current status. Observers call this on their own startup:
    /// broadcasts sent while no observer existed are lost.
    pub async fn status(&self) -> StatusSnapshot {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(SurfaceCommand::Status { reply })
            .await
            .is_err()
        {
            return StatusSnapshot::lost();
        }
        rx.await.unwrap_or_else(|_| StatusSnapshot::lost())
    }

    pub async fn dismiss(&self) -> Result<(), RecorderError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SurfaceCommand::Dismiss { reply })
            .await
            .map_err(|_| RecorderError::SurfaceGone)?;
        rx.await.map_err(|_| RecorderError::SurfaceGone)?
    }

    pub async fn new_recording(&self) -> Result<(), RecorderError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SurfaceCommand::NewRecording { reply })
            .await
            .map_err(|_| RecorderError::SurfaceGone)?;
        rx.await.map_err(|_| RecorderError::SurfaceGone)?
    }

    pub async fn result(&self) -> Result<RecordingResult, RecorderError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SurfaceCommand::Result { reply })
            .await
            .map_err(|_| RecorderError::SurfaceGone)?;
        rx.await.map_err(|_| RecorderError::SurfaceGone)?
    }

    /// Tear the surface down the way the host runtime would: in-flight
    /// device streams are abandoned and unflushed chunks are lost.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(SurfaceCommand::Shutdown { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<StatusSnapshot> {
        self.status.subscribe()
    }
}

pub struct RecordingSurface {
    broker: Arc<CaptureBroker>,
    platform: Arc<dyn CapturePlatform>,
    sink: Arc<ResultSink>,
    transcriber: Arc<dyn Transcriber>,
    summarizer: Arc<dyn Summarizer>,
    status_channel: StatusChannel,
    capture: CaptureConfig,
    status: LifecycleStatus,
    session: Option<RecordingSession>,
}

impl RecordingSurface {
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        broker: Arc<CaptureBroker>,
        platform: Arc<dyn CapturePlatform>,
        sink: Arc<ResultSink>,
        transcriber: Arc<dyn Transcriber>,
        summarizer: Arc<dyn Summarizer>,
        status_channel: StatusChannel,
        capture: CaptureConfig,
    ) -> SurfaceHandle {
        if broker.mark_surface_provisioned() {
            warn!("A durable recording surface was already provisioned");
        }

        let surface = Self {
            broker,
            platform,
            sink,
            transcriber,
            summarizer,
            status_channel: status_channel.clone(),
            capture,
            status: LifecycleStatus::Idle,
            session: None,
        };

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(surface.run(rx));

        SurfaceHandle {
            tx,
            status: status_channel,
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<SurfaceCommand>) {
        info!("Recording surface ready");

        while let Some(command) = rx.recv().await {
            match command {
                SurfaceCommand::Start {
                    tab_id,
                    mic,
                    label,
                    reply,
                } => {
                    let result = self.handle_start(tab_id, mic, label).await;
                    let _ = reply.send(result);
                }
                SurfaceCommand::Stop { reply } => {
                    let result = self.handle_stop().await;
                    let _ = reply.send(result);
                }
                SurfaceCommand::Status { reply } => {
                    let _ = reply.send(StatusSnapshot::of(&self.status));
                }
                SurfaceCommand::Dismiss { reply } => {
                    let _ = reply.send(self.handle_dismiss());
                }
                SurfaceCommand::NewRecording { reply } => {
                    let _ = reply.send(self.handle_new_recording());
                }
                SurfaceCommand::Result { reply } => {
                    let _ = reply.send(self.handle_result());
                }
                SurfaceCommand::Shutdown { reply } => {
                    if self.session.is_some() {
                        warn!("Recording surface evicted mid-recording; unflushed audio is lost");
                    }
                    let _ = reply.send(());
                    break;
                }
            }
        }

        info!("Recording surface stopped");
    }

    fn set_status(&mut self, status: LifecycleStatus) {
        self.status = status;
        self.status_channel.publish(StatusSnapshot::of(&self.status));
    }

    async fn handle_start(
        &mut self,
        tab_id: TabId,
        mic: MicSelector,
        label: Option<String>,
    ) -> Result<StartedRecording, RecorderError> {
        // The lifecycle guard is the sole mutual exclusion: concurrent starts
        // are rejected, not queued, and the state is left untouched.
        if !self.status.can_start() {
            return Err(RecorderError::AlreadyActive);
        }

        self.set_status(LifecycleStatus::Starting);

        let token = match self.broker.request_token(tab_id).await {
            Ok(token) => token,
            Err(e) => {
                error!("Token request for tab {} failed: {}", tab_id, e);
                self.set_status(LifecycleStatus::Error {
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        match RecordingSession::start(
            self.platform.clone(),
            &token,
            tab_id,
            &mic,
            label,
            &self.capture,
        )
        .await
        {
            Ok(session) => {
                let started = StartedRecording {
                    session_id: session.id().to_string(),
                    started_at: session.started_at(),
                };
                self.session = Some(session);
                self.set_status(LifecycleStatus::Recording {
                    started_at: started.started_at,
                });
                Ok(started)
            }
            Err(e) => {
                error!("Capture start failed: {}", e);
                // A failed start never leaves the machine stuck in Starting
                self.set_status(LifecycleStatus::Error {
                    message: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    async fn handle_stop(&mut self) -> Result<StopOutcome, RecorderError> {
        if self.status.stop_is_noop() {
            info!("Stop requested while {}; nothing to do", self.status.name());
            return Ok(StopOutcome {
                finalized: false,
                blob_bytes: 0,
            });
        }

        let Some(session) = self.session.take() else {
            return Ok(StopOutcome {
                finalized: false,
                blob_bytes: 0,
            });
        };

        self.set_status(LifecycleStatus::Stopping);
        let label = session.label().map(str::to_string);

        // Finalize releases every device resource unconditionally; only the
        // persistence outcome is reported separately below.
        let blob = match session.finalize().await {
            Ok(blob) => blob,
            Err(e) => {
                error!("Finalize failed: {}", e);
                self.set_status(LifecycleStatus::Error {
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };
        let blob_bytes = blob.data.len();

        if let Err(e) = self.sink.store_blob(&blob) {
            let stop_err = crate::error::StopError::SinkWriteFailed(e.to_string());
            error!("{}", stop_err);
            self.set_status(LifecycleStatus::Error {
                message: stop_err.to_string(),
            });
            return Err(stop_err.into());
        }

        if let Some(label) = &label {
            info!("Recording labeled '{}' persisted", label);
        }

        self.set_status(LifecycleStatus::Processing);

        let transcript = match self.transcriber.transcribe(&blob).await {
            Ok(text) => text,
            Err(e) => {
                self.set_status(LifecycleStatus::Error {
                    message: format!("transcription failed: {e}"),
                });
                return Err(RecorderError::Processing(e.to_string()));
            }
        };

        let summary = match self.summarizer.summarize(&transcript).await {
            Ok(text) => text,
            Err(e) => {
                self.set_status(LifecycleStatus::Error {
                    message: format!("summarization failed: {e}"),
                });
                return Err(RecorderError::Processing(e.to_string()));
            }
        };

        self.set_status(LifecycleStatus::Results {
            transcript,
            summary,
        });

        Ok(StopOutcome {
            finalized: true,
            blob_bytes,
        })
    }

    fn handle_dismiss(&mut self) -> Result<(), RecorderError> {
        if !self.status.can_dismiss() {
            return Err(RecorderError::InvalidState {
                action: "dismiss",
                state: self.status.name(),
            });
        }
        self.set_status(LifecycleStatus::Idle);
        Ok(())
    }

    fn handle_new_recording(&mut self) -> Result<(), RecorderError> {
        if !self.status.can_reset() {
            return Err(RecorderError::InvalidState {
                action: "start a new recording",
                state: self.status.name(),
            });
        }
        self.set_status(LifecycleStatus::Idle);
        Ok(())
    }

    fn handle_result(&self) -> Result<RecordingResult, RecorderError> {
        match &self.status {
            LifecycleStatus::Results {
                transcript,
                summary,
            } => Ok(RecordingResult {
                transcript: transcript.clone(),
                summary: summary.clone(),
            }),
            _ => Err(RecorderError::NoResult),
        }
    }
}
