//! Chunked audio encoder.
//!
//! Mixed frames are accumulated into fixed-interval chunks of raw
//! little-endian PCM. Chunk order is significant: concatenating the chunks
//! reproduces the audio in capture order. Finalization concatenates every
//! chunk and wraps the result in a WAV container in memory.

use std::io::Cursor;

use anyhow::Context;
use tracing::{debug, info};

use super::frame::AudioFrame;
use crate::error::{CaptureError, StopError};

/// Encoder configuration
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Interval between emitted chunks in milliseconds
    pub chunk_interval_ms: u64,
    /// Sample rate of incoming frames
    pub sample_rate: u32,
    /// Channel count of incoming frames
    pub channels: u16,
}

/// One encoded chunk: opaque bytes (LE i16 PCM) plus its position in the
/// emission order.
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    pub index: usize,
    pub data: Vec<u8>,
}

/// The finalized recording for one session.
#[derive(Debug, Clone)]
pub struct RecordingBlob {
    /// Container bytes (WAV)
    pub data: Vec<u8>,
    /// Media type of `data`
    pub media_type: String,
}

/// Accumulates mixed frames and cuts them into fixed-interval chunks.
pub struct ChunkedEncoder {
    config: EncoderConfig,
    samples_per_chunk: usize,
    chunks: Vec<EncodedChunk>,
    pending: Vec<u8>,
    pending_samples: usize,
    active: bool,
}

impl ChunkedEncoder {
    pub fn new(config: EncoderConfig) -> Result<Self, CaptureError> {
        if config.chunk_interval_ms == 0 || config.sample_rate == 0 || config.channels == 0 {
            return Err(CaptureError::EncoderInitFailed(format!(
                "invalid encoder parameters: {}ms interval, {}Hz, {} channels",
                config.chunk_interval_ms, config.sample_rate, config.channels
            )));
        }

        let samples_per_chunk = (config.sample_rate as u64 * config.channels as u64
            * config.chunk_interval_ms
            / 1000) as usize;

        info!(
            "Chunked encoder initialized: {}ms chunks ({} samples each)",
            config.chunk_interval_ms, samples_per_chunk
        );

        Ok(Self {
            config,
            samples_per_chunk,
            chunks: Vec::new(),
            pending: Vec::new(),
            pending_samples: 0,
            active: true,
        })
    }

    /// Append one mixed frame; rotates a chunk out when the interval's worth
    /// of samples has accumulated.
    pub fn push_frame(&mut self, frame: &AudioFrame) {
        if !self.active {
            return;
        }

        for &sample in &frame.samples {
            self.pending.extend_from_slice(&sample.to_le_bytes());
        }
        self.pending_samples += frame.samples.len();

        while self.pending_samples >= self.samples_per_chunk {
            let split_at = self.samples_per_chunk * 2; // bytes per chunk
            let rest = self.pending.split_off(split_at);
            let data = std::mem::replace(&mut self.pending, rest);
            self.pending_samples -= self.samples_per_chunk;

            let index = self.chunks.len();
            debug!("Chunk {} complete: {} bytes", index, data.len());
            self.chunks.push(EncodedChunk { index, data });
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Flush the partial chunk, concatenate everything in emission order and
    /// wrap it in a WAV container.
    pub fn finalize(mut self) -> Result<RecordingBlob, StopError> {
        self.active = false;

        if self.pending_samples > 0 {
            let index = self.chunks.len();
            let data = std::mem::take(&mut self.pending);
            self.chunks.push(EncodedChunk { index, data });
        }

        let total_bytes: usize = self.chunks.iter().map(|c| c.data.len()).sum();
        if total_bytes == 0 {
            return Err(StopError::EmptyRecording);
        }

        let spec = hound::WavSpec {
            channels: self.config.channels,
            sample_rate: self.config.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        let result: anyhow::Result<()> = (|| {
            let mut writer =
                hound::WavWriter::new(&mut cursor, spec).context("failed to create WAV writer")?;
            for chunk in &self.chunks {
                for bytes in chunk.data.chunks_exact(2) {
                    let sample = i16::from_le_bytes([bytes[0], bytes[1]]);
                    writer
                        .write_sample(sample)
                        .context("failed to write sample")?;
                }
            }
            writer.finalize().context("failed to finalize WAV")?;
            Ok(())
        })();
        result.map_err(|e| StopError::Finalize(e.to_string()))?;

        let data = cursor.into_inner();
        info!(
            "Recording finalized: {} chunks, {} PCM bytes, {} container bytes",
            self.chunks.len(),
            total_bytes,
            data.len()
        );

        Ok(RecordingBlob {
            data,
            media_type: "audio/wav".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::frame::StreamSource;

    fn config() -> EncoderConfig {
        EncoderConfig {
            chunk_interval_ms: 10, // 160 samples per chunk at 16kHz mono
            sample_rate: 16000,
            channels: 1,
        }
    }

    fn frame(samples: Vec<i16>, timestamp_ms: u64) -> AudioFrame {
        AudioFrame {
            samples,
            sample_rate: 16000,
            channels: 1,
            timestamp_ms,
            source: StreamSource::Tab,
        }
    }

    #[test]
    fn test_rejects_zero_interval() {
        let bad = EncoderConfig {
            chunk_interval_ms: 0,
            sample_rate: 16000,
            channels: 1,
        };
        assert!(matches!(
            ChunkedEncoder::new(bad),
            Err(CaptureError::EncoderInitFailed(_))
        ));
    }

    #[test]
    fn test_chunks_rotate_at_interval() {
        let mut encoder = ChunkedEncoder::new(config()).unwrap();

        // 3.5 chunks worth of samples
        encoder.push_frame(&frame(vec![0i16; 560], 0));

        assert_eq!(encoder.chunk_count(), 3);
    }

    #[test]
    fn test_finalize_empty_is_distinct_error() {
        let encoder = ChunkedEncoder::new(config()).unwrap();
        assert!(matches!(encoder.finalize(), Err(StopError::EmptyRecording)));
    }

    #[test]
    fn test_concatenation_preserves_emission_order() {
        let mut encoder = ChunkedEncoder::new(config()).unwrap();

        // Monotonically increasing samples across several chunk boundaries
        let samples: Vec<i16> = (0..500).collect();
        for (i, window) in samples.chunks(100).enumerate() {
            encoder.push_frame(&frame(window.to_vec(), i as u64 * 6));
        }

        let blob = encoder.finalize().unwrap();
        assert_eq!(blob.media_type, "audio/wav");

        let reader = hound::WavReader::new(Cursor::new(blob.data)).unwrap();
        let decoded: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();

        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_finalize_flushes_partial_chunk() {
        let mut encoder = ChunkedEncoder::new(config()).unwrap();

        // Less than one full chunk
        encoder.push_frame(&frame(vec![7i16; 50], 0));
        assert_eq!(encoder.chunk_count(), 0);

        let blob = encoder.finalize().unwrap();
        let reader = hound::WavReader::new(Cursor::new(blob.data)).unwrap();
        assert_eq!(reader.len(), 50);
    }

    #[test]
    fn test_push_after_many_frames_counts_bytes() {
        let mut encoder = ChunkedEncoder::new(config()).unwrap();

        for i in 0..10u64 {
            encoder.push_frame(&frame(vec![1i16; 160], i * 10));
        }

        assert_eq!(encoder.chunk_count(), 10);
        let blob = encoder.finalize().unwrap();
        assert!(blob.data.len() > 10 * 160 * 2); // PCM plus WAV header
    }
}
