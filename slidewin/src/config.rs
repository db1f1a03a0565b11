//! Run configuration and process topology.

use crate::error::{Result, SlidewinError};
use crate::params::ProtocolParams;
use crate::transport::{check_rank, Rank};

/// Default dataset size (N)
pub const DEFAULT_ITEMS: usize = 512;

/// Default frame size (F)
pub const DEFAULT_FRAME_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlidewinConfig {
    pub items: usize,
    pub frame_len: usize,
    pub sender_rank: Rank,
    /// DISCONNECTs the sender waits for; `None` means one per receiver
    pub disconnects: Option<usize>,
    /// Reject an `items` that `frame_len` does not divide instead of truncating
    pub strict: bool,
}

impl Default for SlidewinConfig {
    fn default() -> Self {
        Self {
            items: DEFAULT_ITEMS,
            frame_len: DEFAULT_FRAME_LEN,
            sender_rank: 0,
            disconnects: None,
            strict: false,
        }
    }
}

impl SlidewinConfig {
    /// Validate the frame geometry.
    ///
    /// A non-divisible dataset keeps the truncating behavior (trailing
    /// `items % frame_len` elements are never sent) unless `strict` is set.
    pub fn protocol_params(&self) -> Result<ProtocolParams> {
        let params = ProtocolParams::new(self.items, self.frame_len)?;
        if !params.is_exact() {
            if self.strict {
                return Err(SlidewinError::config(format!(
                    "frame length {} does not divide {} items",
                    self.frame_len, self.items
                )));
            }
            trace_warn!(
                items = self.items,
                frame_len = self.frame_len,
                dropped = params.remainder(),
                "frame length does not divide the dataset; trailing elements will not be transferred"
            );
        }
        Ok(params)
    }

    pub fn topology(&self, size: usize) -> Result<Topology> {
        Topology::new(size, self.sender_rank)
    }

    /// DISCONNECTs the sender must observe before leaving its serve loop.
    pub fn disconnect_limit(&self, topology: &Topology) -> usize {
        self.disconnects.unwrap_or_else(|| topology.receivers())
    }
}

/// One sender rank, every other rank a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    size: usize,
    sender: Rank,
}

impl Topology {
    pub fn new(size: usize, sender: Rank) -> Result<Self> {
        if size < 2 {
            return Err(SlidewinError::config(format!(
                "need a sender and at least one receiver, got {} participant(s)",
                size
            )));
        }
        check_rank(sender, size)?;
        Ok(Self { size, sender })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn sender(&self) -> Rank {
        self.sender
    }

    pub fn receivers(&self) -> usize {
        self.size - 1
    }

    pub fn is_sender(&self, rank: Rank) -> bool {
        rank == self.sender
    }

    pub fn receiver_ranks(&self) -> impl Iterator<Item = Rank> + '_ {
        (0..self.size).filter(move |&r| r != self.sender)
    }
}
