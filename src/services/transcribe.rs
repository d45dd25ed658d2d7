use anyhow::Result;
use tracing::info;

use super::Transcriber;
use crate::audio::RecordingBlob;

/// Stand-in transcriber until a speech-to-text provider is plugged in.
///
/// Reports what was captured and how to get a real transcript, with a rough
/// duration estimate from the blob size.
pub struct PlaceholderTranscriber {
    /// Rough container bytes per second of audio, for the duration estimate
    bytes_per_second: usize,
}

impl PlaceholderTranscriber {
    pub fn new() -> Self {
        Self {
            bytes_per_second: 32000, // 16kHz mono 16-bit PCM
        }
    }

    fn estimate_seconds(&self, blob: &RecordingBlob) -> usize {
        blob.data.len() / self.bytes_per_second.max(1)
    }
}

impl Default for PlaceholderTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transcriber for PlaceholderTranscriber {
    async fn transcribe(&self, audio: &RecordingBlob) -> Result<String> {
        let seconds = self.estimate_seconds(audio);
        info!(
            "Placeholder transcription for {} bytes (~{}s)",
            audio.data.len(),
            seconds
        );

        Ok(format!(
            "[transcription not available]\n\n\
             No speech-to-text provider is configured. The recording (about {seconds} seconds) \
             was captured and saved successfully.\n\n\
             Export the audio with the download action and run it through an external \
             transcription tool, or plug a transcription provider into this service."
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_placeholder_mentions_estimated_duration() {
        let transcriber = PlaceholderTranscriber::new();
        let blob = RecordingBlob {
            data: vec![0u8; 32000 * 12],
            media_type: "audio/wav".to_string(),
        };

        let text = transcriber.transcribe(&blob).await.unwrap();
        assert!(text.contains("12 seconds"));
        assert!(text.contains("[transcription not available]"));
    }
}
