//! Error types for slidewin.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SlidewinError>;

#[derive(Error, Debug)]
pub enum SlidewinError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Every peer endpoint is gone; a pending receive can never complete.
    #[error("Transport disconnected")]
    Disconnected,

    #[error("Message truncated: {got} elements do not fit a {capacity}-element buffer")]
    Truncated { capacity: usize, got: usize },

    #[error("Invalid rank {rank} for a world of {size}")]
    InvalidRank { rank: usize, size: usize },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Malformed packet from {from}: {reason}")]
    Malformed { from: String, reason: &'static str },

    #[error("Sequence gap from rank {source_rank}: expected {expected}, got {got}")]
    SequenceGap {
        source_rank: usize,
        expected: u64,
        got: u64,
    },

    #[error("Message of {count} elements exceeds transport limit of {limit}")]
    FrameTooLarge { count: usize, limit: usize },

    /// Some peer never bound its socket within the startup window.
    #[error("Peers not ready after {waited:?} (rank {rank} still waiting)")]
    StartupTimeout { rank: usize, waited: std::time::Duration },
}

impl SlidewinError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
