//! Ranked message-passing transport trait
//!
//! The protocol roles only ever talk to a `Transport`; the in-process world
//! and the UDP transport both implement it.

use crate::error::{Result, SlidewinError};

/// Endpoint identity within a world of `size` participants.
pub type Rank = usize;

/// Message tag. The protocol tags every message with the sender's rank.
pub type Tag = i32;

/// Which sender a receive accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Any,
    Rank(Rank),
}

impl Source {
    #[inline]
    pub fn matches(self, rank: Rank) -> bool {
        match self {
            Source::Any => true,
            Source::Rank(r) => r == rank,
        }
    }
}

/// Envelope of a completed receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub source: Rank,
    pub tag: Tag,
    /// Elements written into the receive buffer
    pub count: usize,
}

/// Core transport trait - all transports implement this
///
/// Messages between one pair of endpoints are delivered in the order they
/// were sent. Receives accept any tag.
pub trait Transport {
    /// Own rank
    fn rank(&self) -> Rank;

    /// Number of participants
    fn size(&self) -> usize;

    /// Hand `data` to the transport for `dest`. Completes without waiting
    /// for the matching receive.
    fn send(&mut self, dest: Rank, tag: Tag, data: &[i32]) -> Result<()>;

    /// Block until a message from `source` arrives and copy it into `buf`.
    ///
    /// A message longer than `buf` is consumed and reported as
    /// [`SlidewinError::Truncated`].
    fn recv(&mut self, source: Source, buf: &mut [i32]) -> Result<Status>;

    /// Collective shutdown: returns once every rank has called `finalize`.
    /// Calling it again is a no-op.
    fn finalize(&mut self) -> Result<()>;

    /// Largest message, in elements, a single `send` accepts.
    fn max_message_len(&self) -> usize {
        usize::MAX
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn rank(&self) -> Rank {
        (**self).rank()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn send(&mut self, dest: Rank, tag: Tag, data: &[i32]) -> Result<()> {
        (**self).send(dest, tag, data)
    }

    fn recv(&mut self, source: Source, buf: &mut [i32]) -> Result<Status> {
        (**self).recv(source, buf)
    }

    fn finalize(&mut self) -> Result<()> {
        (**self).finalize()
    }

    fn max_message_len(&self) -> usize {
        (**self).max_message_len()
    }
}

pub(crate) fn check_rank(rank: Rank, size: usize) -> Result<()> {
    if rank < size {
        Ok(())
    } else {
        Err(SlidewinError::InvalidRank { rank, size })
    }
}
