//! Shared frame geometry.
//!
//! Both roles derive their loop bounds from the same [`ProtocolParams`]
//! so the sender and receiver can never disagree on the frame count.

use crate::error::{Result, SlidewinError};
use std::ops::Range;

/// Dataset size and frame size, with the frame count computed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolParams {
    items: usize,
    frame_len: usize,
    frame_count: usize,
}

impl ProtocolParams {
    /// `items` may be any size; only whole frames are ever transferred.
    pub fn new(items: usize, frame_len: usize) -> Result<Self> {
        if frame_len == 0 {
            return Err(SlidewinError::config("frame length must be at least 1"));
        }
        if items > i32::MAX as usize {
            return Err(SlidewinError::config(format!(
                "dataset of {} items does not fit i32 values",
                items
            )));
        }
        Ok(Self {
            items,
            frame_len,
            frame_count: items / frame_len,
        })
    }

    /// N
    #[inline]
    pub fn items(&self) -> usize {
        self.items
    }

    /// F
    #[inline]
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Number of full frames per session (`N / F`).
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Trailing elements no frame covers (`N mod F`).
    #[inline]
    pub fn remainder(&self) -> usize {
        self.items % self.frame_len
    }

    /// Elements actually transferred per session.
    #[inline]
    pub fn covered(&self) -> usize {
        self.frame_count * self.frame_len
    }

    #[inline]
    pub fn is_exact(&self) -> bool {
        self.remainder() == 0
    }

    /// Dataset index range of frame `index`.
    #[inline]
    pub fn frame_range(&self, index: usize) -> Range<usize> {
        let start = index * self.frame_len;
        start..start + self.frame_len
    }

    /// Ranges of every full frame, in send order.
    pub fn frames(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.frame_count).map(move |k| self.frame_range(k))
    }
}

/// The canonical dataset `a[i] = i`.
pub fn dataset(items: usize) -> Vec<i32> {
    (0..items as i32).collect()
}
