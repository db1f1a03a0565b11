//! Test helpers for slidewin.
//!
//! - [`verify`]: checks a received frame stream against the dataset
//! - [`recording`]: a `Transport` wrapper that logs every message for
//!   session-boundary assertions
//! - [`sequence`]: per-pair sequence checking of captured datagrams

pub mod recording;
pub mod sequence;
pub mod verify;

pub use recording::{session_traces, Event, EventLog, RecordingTransport, SessionTrace};
pub use verify::{FrameCheck, FrameStats, FrameVerifier};
pub use sequence::{is_release, SequenceCheck, SequenceChecker, SequenceStats};
