// Audio mixer for combining the tab stream and the microphone stream
//
// The mixer buffers frames from each source, pulls one frame per source at a
// time, and sums the samples with clipping. No gain normalization is applied:
// mixing is plain summation at the sample level.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info, warn};

use super::frame::{AudioFrame, StreamSource};

/// Configuration for the stream mixer
#[derive(Debug, Clone)]
pub struct MixerConfig {
    /// Expected sample rate of incoming frames
    pub sample_rate: u32,
    /// Expected channel count of incoming frames
    pub channels: u16,
    /// Maximum buffering delay in milliseconds; frames older than this are
    /// dropped to prevent unbounded buffering
    pub max_buffer_delay_ms: u64,
    /// Sources to include in the mix
    pub enabled_sources: HashSet<StreamSource>,
}

impl MixerConfig {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        let mut enabled_sources = HashSet::new();
        enabled_sources.insert(StreamSource::Tab);
        enabled_sources.insert(StreamSource::Microphone);

        Self {
            sample_rate,
            channels,
            max_buffer_delay_ms: 200,
            enabled_sources,
        }
    }
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self::new(16000, 1)
    }
}

/// Mixes the tab stream and (if present) the microphone stream into one
/// ordered sequence of output frames.
pub struct StreamMixer {
    config: MixerConfig,
    /// Buffers for each audio source type
    buffers: HashMap<StreamSource, VecDeque<AudioFrame>>,
    current_position_ms: u64,
}

impl StreamMixer {
    pub fn new(config: MixerConfig) -> Self {
        info!(
            "Stream mixer initialized: {}Hz, {} channels, {} enabled sources",
            config.sample_rate,
            config.channels,
            config.enabled_sources.len()
        );

        let mut buffers = HashMap::new();
        for source in &config.enabled_sources {
            buffers.insert(*source, VecDeque::new());
        }

        Self {
            config,
            buffers,
            current_position_ms: 0,
        }
    }

    /// Feed one frame in; returns a mixed frame when one is ready.
    pub fn push(&mut self, frame: AudioFrame) -> Option<AudioFrame> {
        self.buffer_frame(frame);
        self.mix_next()
    }

    /// Flush whatever is still buffered, in order.
    pub fn drain(&mut self) -> Vec<AudioFrame> {
        let mut out = Vec::new();
        while let Some(mixed) = self.mix_next() {
            out.push(mixed);
        }
        out
    }

    /// Buffer a frame based on its source type
    fn buffer_frame(&mut self, frame: AudioFrame) {
        if !self.config.enabled_sources.contains(&frame.source) {
            debug!(
                "Skipping frame from disabled source: {:?} at {}ms",
                frame.source, frame.timestamp_ms
            );
            return;
        }

        if frame.sample_rate != self.config.sample_rate {
            warn!(
                "Frame sample rate mismatch: expected {}, got {}. Dropping frame.",
                self.config.sample_rate, frame.sample_rate
            );
            return;
        }

        if frame.channels != self.config.channels {
            warn!(
                "Frame channel count mismatch: expected {}, got {}. Dropping frame.",
                self.config.channels, frame.channels
            );
            return;
        }

        if let Some(buffer) = self.buffers.get_mut(&frame.source) {
            buffer.push_back(frame);
        }

        self.cleanup_old_frames();
    }

    /// Remove frames that are beyond the max buffer delay
    fn cleanup_old_frames(&mut self) {
        let cutoff_time = self
            .current_position_ms
            .saturating_sub(self.config.max_buffer_delay_ms);

        for (source, buffer) in &mut self.buffers {
            while let Some(frame) = buffer.front() {
                if frame.timestamp_ms < cutoff_time {
                    warn!(
                        "Dropping old {:?} frame at {}ms (current position: {}ms)",
                        source, frame.timestamp_ms, self.current_position_ms
                    );
                    buffer.pop_front();
                } else {
                    break;
                }
            }
        }
    }

    /// Pull one frame from every buffer that has data and mix them.
    ///
    /// Returns None when no buffer has data.
    fn mix_next(&mut self) -> Option<AudioFrame> {
        let mut frames_to_mix: Vec<AudioFrame> = Vec::new();

        for buffer in self.buffers.values_mut() {
            if let Some(frame) = buffer.pop_front() {
                frames_to_mix.push(frame);
            }
        }

        if frames_to_mix.is_empty() {
            return None;
        }

        // Single source: pass the frame straight through
        if frames_to_mix.len() == 1 {
            let frame = frames_to_mix.into_iter().next()?;
            self.current_position_ms = frame.timestamp_ms;
            return Some(frame);
        }

        let mixed = self.mix_frames(&frames_to_mix);
        self.current_position_ms = mixed.timestamp_ms;
        Some(mixed)
    }

    /// Sum the samples of several frames with clipping.
    fn mix_frames(&self, frames: &[AudioFrame]) -> AudioFrame {
        // Use the earliest timestamp and the longest frame's length
        let timestamp_ms = frames.iter().map(|f| f.timestamp_ms).min().unwrap_or(0);
        let max_len = frames.iter().map(|f| f.samples.len()).max().unwrap_or(0);
        let mut mixed_samples = Vec::with_capacity(max_len);

        for i in 0..max_len {
            let mut sum: i32 = 0;
            for frame in frames {
                let sample = frame.samples.get(i).copied().unwrap_or(0);
                sum += sample as i32;
            }

            // Clip to prevent overflow
            let mixed = sum.clamp(i16::MIN as i32, i16::MAX as i32);
            mixed_samples.push(mixed as i16);
        }

        AudioFrame {
            samples: mixed_samples,
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
            timestamp_ms,
            source: StreamSource::Tab, // Mixed frames are tagged as tab audio
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(source: StreamSource, timestamp_ms: u64, samples: Vec<i16>) -> AudioFrame {
        AudioFrame {
            samples,
            sample_rate: 16000,
            channels: 1,
            timestamp_ms,
            source,
        }
    }

    #[test]
    fn test_mixer_creation() {
        let mixer = StreamMixer::new(MixerConfig::default());

        assert_eq!(mixer.buffers.len(), 2); // Tab and Microphone by default
        assert_eq!(mixer.current_position_ms, 0);
    }

    #[test]
    fn test_mix_frames_equal_length() {
        let mixer = StreamMixer::new(MixerConfig::default());

        let frames = vec![
            frame(StreamSource::Tab, 0, vec![100, 200, 300]),
            frame(StreamSource::Microphone, 0, vec![50, 100, 150]),
        ];
        let mixed = mixer.mix_frames(&frames);

        assert_eq!(mixed.samples, vec![150, 300, 450]);
    }

    #[test]
    fn test_mix_frames_with_clipping() {
        let mixer = StreamMixer::new(MixerConfig::default());

        let frames = vec![
            frame(StreamSource::Tab, 0, vec![i16::MAX - 100]),
            frame(StreamSource::Microphone, 0, vec![200]),
        ];
        let mixed = mixer.mix_frames(&frames);

        assert_eq!(mixed.samples[0], i16::MAX); // Clipped to max
    }

    #[test]
    fn test_mix_frames_different_lengths() {
        let mixer = StreamMixer::new(MixerConfig::default());

        let frames = vec![
            frame(StreamSource::Tab, 0, vec![100, 200]),
            frame(StreamSource::Microphone, 0, vec![50, 100, 150, 200]),
        ];
        let mixed = mixer.mix_frames(&frames);

        assert_eq!(mixed.samples.len(), 4); // Length of longer frame
        assert_eq!(mixed.samples, vec![150, 300, 150, 200]);
    }

    #[test]
    fn test_push_single_source_passes_through() {
        let mut mixer = StreamMixer::new(MixerConfig::default());

        let mixed = mixer.push(frame(StreamSource::Tab, 100, vec![1, 2, 3]));

        let mixed = mixed.expect("single source should mix immediately");
        assert_eq!(mixed.samples, vec![1, 2, 3]);
        assert_eq!(mixed.timestamp_ms, 100);
    }

    #[test]
    fn test_push_two_sources_sums() {
        let mut mixer = StreamMixer::new(MixerConfig::default());

        // First push drains the tab frame alone; buffer the mic frame first
        // so the second push sees both.
        mixer.buffer_frame(frame(StreamSource::Microphone, 0, vec![10, 10]));
        let mixed = mixer.push(frame(StreamSource::Tab, 0, vec![5, 5]));

        let mixed = mixed.expect("both sources buffered");
        assert_eq!(mixed.samples, vec![15, 15]);
    }

    #[test]
    fn test_drain_flushes_remaining() {
        let mut mixer = StreamMixer::new(MixerConfig::default());

        mixer.buffer_frame(frame(StreamSource::Tab, 0, vec![1]));
        mixer.buffer_frame(frame(StreamSource::Tab, 100, vec![2]));

        let drained = mixer.drain();
        assert_eq!(drained.len(), 2);
        assert!(mixer.drain().is_empty());
    }

    #[test]
    fn test_mismatched_sample_rate_dropped() {
        let mut mixer = StreamMixer::new(MixerConfig::default());

        let bad = AudioFrame {
            samples: vec![1, 2],
            sample_rate: 48000,
            channels: 1,
            timestamp_ms: 0,
            source: StreamSource::Tab,
        };

        assert!(mixer.push(bad).is_none());
    }
}
