//! Opaque post-processing services.
//!
//! Transcription and summarization are pluggable: the traits fix the
//! request/response contract, the shipped implementations are placeholders
//! (real speech-to-text and language-model summarization are out of scope).

mod summarize;
mod transcribe;

use anyhow::Result;

use crate::audio::RecordingBlob;

pub use summarize::HeuristicSummarizer;
pub use transcribe::PlaceholderTranscriber;

/// Encoded audio in, UTF-8 transcript out.
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &RecordingBlob) -> Result<String>;
}

/// Transcript in, structured markdown summary out.
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<String>;
}
