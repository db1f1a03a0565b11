//! Frame stream verification.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Checks that frames arrive complete, in order, and exactly once.
///
/// Built from the sender's dataset; each observed frame is compared with the
/// frame expected at the current position of the stream.
pub struct FrameVerifier {
    /// Content hash per frame index
    expected: Vec<u64>,
    /// Index the next observed frame should have
    next: AtomicUsize,
    in_order: AtomicU64,
    out_of_order: AtomicU64,
    corrupt: AtomicU64,
    extra: AtomicU64,
    /// Frame indices in arrival order (None for unrecognised content)
    arrivals: Mutex<Vec<Option<usize>>>,
}

impl FrameVerifier {
    /// Expect every full frame of `dataset`, in order.
    pub fn for_dataset(dataset: &[i32], frame_len: usize) -> Self {
        let expected = dataset.chunks_exact(frame_len).map(frame_hash).collect();
        Self {
            expected,
            next: AtomicUsize::new(0),
            in_order: AtomicU64::new(0),
            out_of_order: AtomicU64::new(0),
            corrupt: AtomicU64::new(0),
            extra: AtomicU64::new(0),
            arrivals: Mutex::new(Vec::new()),
        }
    }

    pub fn expected_frames(&self) -> usize {
        self.expected.len()
    }

    /// Check the next frame of the stream
    pub fn observe(&self, frame: &[i32]) -> FrameCheck {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        let hash = frame_hash(frame);
        let found = self.expected.iter().position(|&h| h == hash);
        self.arrivals.lock().unwrap().push(found);

        if index >= self.expected.len() {
            self.extra.fetch_add(1, Ordering::Relaxed);
            return FrameCheck::Extra { position: index };
        }
        match found {
            Some(i) if i == index => {
                self.in_order.fetch_add(1, Ordering::Relaxed);
                FrameCheck::InOrder { index }
            }
            Some(got) => {
                self.out_of_order.fetch_add(1, Ordering::Relaxed);
                FrameCheck::OutOfOrder {
                    expected: index,
                    got,
                }
            }
            None => {
                self.corrupt.fetch_add(1, Ordering::Relaxed);
                FrameCheck::Corrupt { position: index }
            }
        }
    }

    /// Frame indices in the order they arrived
    pub fn arrivals(&self) -> Vec<Option<usize>> {
        self.arrivals.lock().unwrap().clone()
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            expected: self.expected.len() as u64,
            observed: self.next.load(Ordering::Relaxed) as u64,
            in_order: self.in_order.load(Ordering::Relaxed),
            out_of_order: self.out_of_order.load(Ordering::Relaxed),
            corrupt: self.corrupt.load(Ordering::Relaxed),
            extra: self.extra.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameCheck {
    InOrder { index: usize },
    OutOfOrder { expected: usize, got: usize },
    Corrupt { position: usize },
    /// More frames than the dataset holds
    Extra { position: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameStats {
    pub expected: u64,
    pub observed: u64,
    pub in_order: u64,
    pub out_of_order: u64,
    pub corrupt: u64,
    pub extra: u64,
}

impl FrameStats {
    /// Every expected frame arrived once, in order, and nothing else did.
    pub fn is_complete(&self) -> bool {
        self.in_order == self.expected && self.observed == self.expected
    }
}

/// FNV-1a over the little-endian element bytes
fn frame_hash(frame: &[i32]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in frame.iter().flat_map(|v| v.to_le_bytes()) {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}
