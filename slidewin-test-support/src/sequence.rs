//! Per-pair sequence checking for captured datagrams.

use slidewin_shared::{MessageType, PacketHeader};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Tracks the sequence stream of every (source, destination) pair and
/// counts anything that breaks the 0, 1, 2, ... progression.
pub struct SequenceChecker {
    /// Next expected sequence per (source, destination)
    next: Mutex<HashMap<(u32, u32), u64>>,
    accepted: AtomicU64,
    gaps: AtomicU64,
    duplicates: AtomicU64,
    /// Startup datagrams, which sit outside the sequence
    unsequenced: AtomicU64,
}

impl Default for SequenceChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceChecker {
    pub fn new() -> Self {
        Self {
            next: Mutex::new(HashMap::new()),
            accepted: AtomicU64::new(0),
            gaps: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            unsequenced: AtomicU64::new(0),
        }
    }

    /// Check one sequence number on the `source -> dest` stream
    pub fn observe(&self, source: u32, dest: u32, seq: u64) -> SequenceCheck {
        let mut next = self.next.lock().unwrap();
        let expected = next.entry((source, dest)).or_insert(0);
        if seq == *expected {
            *expected += 1;
            self.accepted.fetch_add(1, Ordering::Relaxed);
            SequenceCheck::Ok
        } else if seq < *expected {
            self.duplicates.fetch_add(1, Ordering::Relaxed);
            SequenceCheck::Duplicate { seq }
        } else {
            let check = SequenceCheck::Gap {
                expected: *expected,
                got: seq,
            };
            // Resynchronise so one loss is counted once.
            *expected = seq + 1;
            self.gaps.fetch_add(1, Ordering::Relaxed);
            check
        }
    }

    /// Check a captured datagram sent to `dest`.
    pub fn observe_packet(&self, dest: u32, packet: &[u8]) -> SequenceCheck {
        let header = match PacketHeader::from_packet(packet) {
            Some((header, _)) => header,
            None => return SequenceCheck::Malformed,
        };
        match header.message_type() {
            Some(t) if t.is_sequenced() => self.observe(header.source, dest, header.sequence),
            Some(_) => {
                self.unsequenced.fetch_add(1, Ordering::Relaxed);
                SequenceCheck::Unsequenced
            }
            None => SequenceCheck::Malformed,
        }
    }

    /// Next expected sequence on a stream (0 if nothing was seen)
    pub fn expected(&self, source: u32, dest: u32) -> u64 {
        self.next
            .lock()
            .unwrap()
            .get(&(source, dest))
            .copied()
            .unwrap_or(0)
    }

    pub fn stats(&self) -> SequenceStats {
        SequenceStats {
            streams: self.next.lock().unwrap().len() as u64,
            accepted: self.accepted.load(Ordering::Relaxed),
            gaps: self.gaps.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            unsequenced: self.unsequenced.load(Ordering::Relaxed),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.gaps.load(Ordering::Relaxed) > 0 || self.duplicates.load(Ordering::Relaxed) > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceCheck {
    Ok,
    Gap { expected: u64, got: u64 },
    Duplicate { seq: u64 },
    /// `Hello` / `Welcome`
    Unsequenced,
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceStats {
    pub streams: u64,
    pub accepted: u64,
    pub gaps: u64,
    pub duplicates: u64,
    pub unsequenced: u64,
}

/// `true` for the datagram that ends a rank's traffic from the barrier root.
pub fn is_release(packet: &[u8]) -> bool {
    PacketHeader::from_packet(packet).and_then(|(header, _)| header.message_type())
        == Some(MessageType::Release)
}
