use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub capture: CaptureConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// Sample rate of capture streams
    pub sample_rate: u32,
    /// Channel count of capture streams
    pub channels: u16,
    /// Interval between encoder chunks in milliseconds. Smaller intervals
    /// lose less data on abrupt teardown at the cost of per-chunk overhead.
    pub chunk_interval_ms: u64,
    /// Interval between frames produced by the capture streams
    pub frame_interval_ms: u64,
    /// Play the tab stream to the local output while recording
    pub monitor_playback: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            chunk_interval_ms: 1000, // durable-surface variant
            frame_interval_ms: 100,
            monitor_playback: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path of the single-entry key-value store file
    pub store_path: String,
    /// Directory receiving exported recordings
    pub downloads_dir: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
