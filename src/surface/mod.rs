//! The Recording Surface.
//!
//! A durable coordinator task that exclusively owns the active recording
//! session and the authoritative lifecycle state. Every other context talks
//! to it over a tagged command channel and observes it through the status
//! broadcast; nothing else holds session resources or a writable copy of the
//! state.

mod coordinator;

pub use coordinator::{
    RecordingResult, RecordingSurface, StartedRecording, StopOutcome, SurfaceHandle,
};
