use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::audio::{AudioFrame, ChunkedEncoder, EncoderConfig, MixerConfig, RecordingBlob, StreamMixer};
use crate::config::CaptureConfig;
use crate::error::{CaptureError, StopError};
use crate::platform::{
    CapturePlatform, CaptureToken, MicConstraints, MicSelector, MonitorHandle, StreamHandle, TabId,
};

/// The live in-memory aggregate of one recording.
///
/// Exclusively owned by the recording surface that created it; every acquired
/// resource is reachable from here and nothing else, so teardown is a single
/// path. Destroying the owning context abandons the device streams and loses
/// any frames the pipeline has not yet chunked.
pub struct RecordingSession {
    id: String,
    label: Option<String>,
    started_at: DateTime<Utc>,
    tab_handle: StreamHandle,
    mic_handle: Option<StreamHandle>,
    monitor: Option<MonitorHandle>,
    /// Owns the mixer and encoder; yields the encoder back when the merged
    /// frame channel closes.
    pipeline: JoinHandle<ChunkedEncoder>,
}

impl RecordingSession {
    /// Acquire streams and start the capture pipeline.
    ///
    /// The token is consumed in a single attempt. Microphone failure is
    /// non-fatal: the session degrades to tab-only capture. Any failure after
    /// a stream was acquired releases everything acquired so far.
    pub async fn start(
        platform: Arc<dyn CapturePlatform>,
        token: &CaptureToken,
        tab: TabId,
        mic: &MicSelector,
        label: Option<String>,
        capture: &CaptureConfig,
    ) -> Result<Self, CaptureError> {
        let tab_stream = platform.open_tab_stream(token).await?;

        // Keep the user hearing the tab while it is being recorded
        let monitor = capture
            .monitor_playback
            .then(|| platform.start_monitor(tab));

        let mic_stream = match platform
            .open_mic_stream(mic, &MicConstraints::default())
            .await
        {
            Ok(stream) => Some(stream),
            Err(e) => {
                warn!("Microphone unavailable, recording tab audio only: {}", e);
                None
            }
        };

        let mixer = StreamMixer::new(MixerConfig::new(capture.sample_rate, capture.channels));
        let encoder = match ChunkedEncoder::new(EncoderConfig {
            chunk_interval_ms: capture.chunk_interval_ms,
            sample_rate: capture.sample_rate,
            channels: capture.channels,
        }) {
            Ok(encoder) => encoder,
            Err(e) => {
                // Never leave partially-acquired device handles open
                tab_stream.handle.stop();
                if let Some(stream) = &mic_stream {
                    stream.handle.stop();
                }
                if let Some(monitor) = &monitor {
                    monitor.stop();
                }
                return Err(e);
            }
        };

        let tab_handle = tab_stream.handle.clone();
        let mic_handle = mic_stream.as_ref().map(|s| s.handle.clone());

        // Merge both streams into one ordered channel, then mix and encode.
        let (merged_tx, merged_rx) = mpsc::channel::<AudioFrame>(64);
        forward_frames(tab_stream.frames, merged_tx.clone());
        if let Some(stream) = mic_stream {
            forward_frames(stream.frames, merged_tx.clone());
        }
        drop(merged_tx);

        let pipeline = spawn_pipeline(merged_rx, mixer, encoder);

        let id = format!("rec-{}", uuid::Uuid::new_v4());
        info!("Recording session {} started for tab {}", id, tab);

        Ok(Self {
            id,
            label,
            started_at: Utc::now(),
            tab_handle,
            mic_handle,
            monitor,
            pipeline,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Stop every stream, wait for the pipeline to drain its last buffered
    /// frames, and produce the finalized blob.
    ///
    /// Resource release is unconditional: streams and the monitor are stopped
    /// before finalization is even attempted, and the pipeline task ends once
    /// the closed channels drain.
    pub async fn finalize(self) -> Result<RecordingBlob, StopError> {
        self.tab_handle.stop();
        if let Some(handle) = &self.mic_handle {
            handle.stop();
        }
        if let Some(monitor) = &self.monitor {
            monitor.stop();
        }

        // Finalization is asynchronous: the last buffered frames flush after
        // the streams close, so wait for the pipeline rather than assuming
        // synchronous completion.
        let encoder = self
            .pipeline
            .await
            .map_err(|e| StopError::Finalize(e.to_string()))?;

        let blob = encoder.finalize()?;
        info!("Session {} finalized: {} bytes", self.id, blob.data.len());
        Ok(blob)
    }
}

fn forward_frames(mut rx: mpsc::Receiver<AudioFrame>, tx: mpsc::Sender<AudioFrame>) {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if tx.send(frame).await.is_err() {
                break;
            }
        }
    });
}

fn spawn_pipeline(
    mut merged_rx: mpsc::Receiver<AudioFrame>,
    mut mixer: StreamMixer,
    mut encoder: ChunkedEncoder,
) -> JoinHandle<ChunkedEncoder> {
    tokio::spawn(async move {
        while let Some(frame) = merged_rx.recv().await {
            if let Some(mixed) = mixer.push(frame) {
                encoder.push_frame(&mixed);
            }
        }

        // Streams closed; flush whatever the mixer still buffers
        for mixed in mixer.drain() {
            encoder.push_frame(&mixed);
        }

        encoder
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{SimulatedConfig, SimulatedPlatform};

    fn fast_capture() -> CaptureConfig {
        CaptureConfig {
            sample_rate: 8000,
            channels: 1,
            chunk_interval_ms: 20,
            frame_interval_ms: 5,
            monitor_playback: true,
        }
    }

    async fn session_for(
        platform: &Arc<SimulatedPlatform>,
        tab: TabId,
    ) -> Result<RecordingSession, CaptureError> {
        let token = platform.mint_capture_token(tab).await.unwrap();
        let dyn_platform: Arc<dyn CapturePlatform> = platform.clone();
        RecordingSession::start(
            dyn_platform,
            &token,
            tab,
            &MicSelector::Default,
            None,
            &fast_capture(),
        )
        .await
    }

    #[tokio::test]
    async fn test_start_then_stop_yields_nonempty_blob() {
        let platform = Arc::new(SimulatedPlatform::new(SimulatedConfig {
            sample_rate: 8000,
            channels: 1,
            frame_interval_ms: 5,
        }));
        platform.register_tab(1, true);

        let session = session_for(&platform, 1).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(60)).await;

        let blob = session.finalize().await.unwrap();
        assert!(blob.data.len() > 44); // more than a bare WAV header
        assert_eq!(blob.media_type, "audio/wav");
    }

    #[tokio::test]
    async fn test_mic_failure_degrades_to_tab_only() {
        let platform = Arc::new(SimulatedPlatform::new(SimulatedConfig {
            sample_rate: 8000,
            channels: 1,
            frame_interval_ms: 5,
        }));
        platform.register_tab(2, true);
        platform.fail_microphone("permission denied");

        let session = session_for(&platform, 2).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(60)).await;

        let blob = session.finalize().await.unwrap();
        assert!(blob.data.len() > 44);
    }

    #[tokio::test]
    async fn test_consumed_token_fails_single_attempt() {
        let platform = Arc::new(SimulatedPlatform::new(SimulatedConfig {
            sample_rate: 8000,
            channels: 1,
            frame_interval_ms: 5,
        }));
        platform.register_tab(3, true);

        let token = platform.mint_capture_token(3).await.unwrap();
        let dyn_platform: Arc<dyn CapturePlatform> = platform.clone();
        let first = RecordingSession::start(
            dyn_platform.clone(),
            &token,
            3,
            &MicSelector::Default,
            None,
            &fast_capture(),
        )
        .await
        .unwrap();

        let second = RecordingSession::start(
            dyn_platform,
            &token,
            3,
            &MicSelector::Default,
            None,
            &fast_capture(),
        )
        .await;
        assert!(matches!(second, Err(CaptureError::TabAudioUnavailable(_))));

        // Release the first session's streams
        let _ = first.finalize().await;
    }

    #[tokio::test]
    async fn test_tab_closed_mid_recording_still_finalizes() {
        let platform = Arc::new(SimulatedPlatform::new(SimulatedConfig {
            sample_rate: 8000,
            channels: 1,
            frame_interval_ms: 5,
        }));
        platform.register_tab(4, true);

        let session = session_for(&platform, 4).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(60)).await;

        platform.close_tab(4);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        // Whatever was captured before the tab closed is still persisted
        let blob = session.finalize().await.unwrap();
        assert!(blob.data.len() > 44);
    }
}
