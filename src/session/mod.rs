//! Recording session management
//!
//! This module provides:
//! - `LifecycleStatus`, the single global recording state and its guards
//! - `RecordingSession`, the exclusively-owned aggregate of every resource a
//!   live recording holds (streams, monitor, mixer, encoder pipeline)

mod lifecycle;
mod session;

pub use lifecycle::LifecycleStatus;
pub use session::RecordingSession;
