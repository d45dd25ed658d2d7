//! Result Sink: the persistence/export boundary.
//!
//! Two destinations for a finalized recording: a single-entry key-value
//! store (base64 payload, last-write-wins, no schema versioning) used to
//! hand blobs between contexts, and a file export named from the recording
//! timestamp with an optional sanitized caller label.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audio::RecordingBlob;
use crate::error::SinkError;

/// The fixed key under which the pending recording is stored.
pub const RECORDING_KEY: &str = "recording_blob";

/// Store entry for the most recent recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecording {
    /// Base64-encoded container bytes
    pub payload: String,
    pub media_type: String,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    recording_blob: Option<StoredRecording>,
}

pub struct ResultSink {
    store_path: PathBuf,
    downloads_dir: PathBuf,
}

impl ResultSink {
    pub fn new(store_path: PathBuf, downloads_dir: PathBuf) -> Result<Self, SinkError> {
        if let Some(parent) = store_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir_all(&downloads_dir)?;

        Ok(Self {
            store_path,
            downloads_dir,
        })
    }

    /// Write the blob under the fixed key, replacing any previous entry.
    pub fn store_blob(&self, blob: &RecordingBlob) -> Result<(), SinkError> {
        let entry = StoredRecording {
            payload: base64::engine::general_purpose::STANDARD.encode(&blob.data),
            media_type: blob.media_type.clone(),
            saved_at: Utc::now(),
        };

        let file = StoreFile {
            recording_blob: Some(entry),
        };
        let json = serde_json::to_vec_pretty(&file).map_err(|e| SinkError::Malformed(e.to_string()))?;
        fs::write(&self.store_path, json)?;

        info!(
            "Stored recording under '{}': {} bytes",
            RECORDING_KEY,
            blob.data.len()
        );
        Ok(())
    }

    /// Read back the pending recording, if one exists.
    pub fn load_blob(&self) -> Result<Option<RecordingBlob>, SinkError> {
        if !self.store_path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&self.store_path)?;
        let file: StoreFile =
            serde_json::from_slice(&bytes).map_err(|e| SinkError::Malformed(e.to_string()))?;

        let Some(entry) = file.recording_blob else {
            return Ok(None);
        };

        let data = base64::engine::general_purpose::STANDARD
            .decode(&entry.payload)
            .map_err(|e| SinkError::Malformed(e.to_string()))?;

        Ok(Some(RecordingBlob {
            data,
            media_type: entry.media_type,
        }))
    }

    /// Export the blob to the downloads directory; returns the written path.
    pub fn export_file(
        &self,
        blob: &RecordingBlob,
        label: Option<&str>,
    ) -> Result<PathBuf, SinkError> {
        let name = Self::file_name(label, Utc::now());
        let path = self.downloads_dir.join(name);
        fs::write(&path, &blob.data)?;
        info!("Exported recording to {:?} ({} bytes)", path, blob.data.len());
        Ok(path)
    }

    /// `recording-<timestamp>.wav`, optionally prefixed with the sanitized
    /// caller label. The timestamp is the RFC 3339 UTC instant with `:` and
    /// `.` replaced by `-`.
    pub fn file_name(label: Option<&str>, at: DateTime<Utc>) -> String {
        let timestamp = at.format("%Y-%m-%dT%H-%M-%S-%3fZ");
        match label.map(Self::sanitize_label).filter(|l| !l.is_empty()) {
            Some(prefix) => format!("{prefix}-recording-{timestamp}.wav"),
            None => format!("recording-{timestamp}.wav"),
        }
    }

    /// Replace runs of non-alphanumeric characters with a single dash.
    pub fn sanitize_label(label: &str) -> String {
        let mut out = String::with_capacity(label.len());
        let mut last_dash = true; // suppress a leading dash
        for c in label.chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c);
                last_dash = false;
            } else if !last_dash {
                out.push('-');
                last_dash = true;
            }
        }
        out.trim_end_matches('-').to_string()
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sink_in(dir: &TempDir) -> ResultSink {
        ResultSink::new(
            dir.path().join("store.json"),
            dir.path().join("downloads"),
        )
        .unwrap()
    }

    fn blob(data: &[u8]) -> RecordingBlob {
        RecordingBlob {
            data: data.to_vec(),
            media_type: "audio/wav".to_string(),
        }
    }

    #[test]
    fn test_store_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir);

        sink.store_blob(&blob(b"RIFFdata")).unwrap();
        let loaded = sink.load_blob().unwrap().unwrap();

        assert_eq!(loaded.data, b"RIFFdata");
        assert_eq!(loaded.media_type, "audio/wav");
    }

    #[test]
    fn test_last_write_wins() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir);

        sink.store_blob(&blob(b"first")).unwrap();
        sink.store_blob(&blob(b"second")).unwrap();

        let loaded = sink.load_blob().unwrap().unwrap();
        assert_eq!(loaded.data, b"second");
    }

    #[test]
    fn test_load_without_store_is_none() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir);
        assert!(sink.load_blob().unwrap().is_none());
    }

    #[test]
    fn test_store_file_uses_fixed_key() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir);

        sink.store_blob(&blob(b"abc")).unwrap();
        let raw = fs::read_to_string(sink.store_path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(json.get(RECORDING_KEY).is_some());
    }

    #[test]
    fn test_file_name_pattern() {
        let at = Utc.with_ymd_and_hms(2026, 8, 28, 14, 30, 5).unwrap();

        let plain = ResultSink::file_name(None, at);
        assert_eq!(plain, "recording-2026-08-28T14-30-05-000Z.wav");

        let labeled = ResultSink::file_name(Some("Weekly Sync #3"), at);
        assert_eq!(labeled, "Weekly-Sync-3-recording-2026-08-28T14-30-05-000Z.wav");
    }

    #[test]
    fn test_sanitize_label() {
        assert_eq!(ResultSink::sanitize_label("Weekly Sync #3"), "Weekly-Sync-3");
        assert_eq!(ResultSink::sanitize_label("!!!"), "");
        assert_eq!(ResultSink::sanitize_label("a__b"), "a-b");
        assert_eq!(ResultSink::sanitize_label("plain"), "plain");
    }

    #[test]
    fn test_export_writes_file() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir);

        let path = sink.export_file(&blob(b"wavbytes"), Some("standup")).unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("standup-recording-"));
        assert!(name.ends_with(".wav"));
        assert_eq!(fs::read(&path).unwrap(), b"wavbytes");
    }
}
