//! In-process transport: one endpoint per participant thread.
//!
//! ```rust,ignore
//! use slidewin::{LocalWorld, Source, Transport};
//!
//! let mut world = LocalWorld::new(2)?.into_iter();
//! let (mut a, mut b) = (world.next().unwrap(), world.next().unwrap());
//!
//! a.send(1, 0, &[1001])?;
//! let mut buf = [0i32; 1];
//! let status = b.recv(Source::Any, &mut buf)?;
//! assert_eq!(status.source, 0);
//! ```
//!
//! Every rank owns a mailbox. A receive scans its mailbox for the oldest
//! message from a matching source, so per-pair FIFO order holds even when
//! messages from other ranks are queued in between.
//!
//! Once the mailbox holds nothing matching, a receive from a specific rank
//! fails with `Disconnected` when that rank's endpoint is dropped, and a
//! receive from any rank fails when every peer is dropped.

use crate::error::{Result, SlidewinError};
use crate::transport::{check_rank, Rank, Source, Status, Tag, Transport};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

struct Envelope {
    source: Rank,
    tag: Tag,
    data: Vec<i32>,
}

#[derive(Default)]
struct Mailbox {
    queue: Mutex<VecDeque<Envelope>>,
    ready: Condvar,
}

#[derive(Default)]
struct BarrierState {
    arrived: usize,
    /// Endpoints dropped without finalizing; the barrier can never complete
    abandoned: usize,
}

struct Shared {
    mailboxes: Vec<Mailbox>,
    /// Endpoints not yet dropped
    live: AtomicUsize,
    /// Per rank: endpoint dropped
    gone: Vec<AtomicBool>,
    barrier: Mutex<BarrierState>,
    barrier_cv: Condvar,
}

impl Shared {
    fn wake_all(&self) {
        for mailbox in &self.mailboxes {
            // Take the lock so a receiver between its check and its wait
            // cannot miss the notification.
            let _guard = mailbox.queue.lock();
            mailbox.ready.notify_all();
        }
        let _guard = self.barrier.lock();
        self.barrier_cv.notify_all();
    }
}

/// Factory for a world of connected [`LocalTransport`] endpoints.
pub struct LocalWorld;

impl LocalWorld {
    /// Create `size` endpoints; element `i` has rank `i`.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(size: usize) -> Result<Vec<LocalTransport>> {
        if size == 0 {
            return Err(SlidewinError::config("world needs at least one participant"));
        }
        let shared = Arc::new(Shared {
            mailboxes: (0..size).map(|_| Mailbox::default()).collect(),
            live: AtomicUsize::new(size),
            gone: (0..size).map(|_| AtomicBool::new(false)).collect(),
            barrier: Mutex::new(BarrierState::default()),
            barrier_cv: Condvar::new(),
        });
        Ok((0..size)
            .map(|rank| LocalTransport {
                rank,
                shared: Arc::clone(&shared),
                finalized: false,
            })
            .collect())
    }
}

/// One participant's endpoint in a [`LocalWorld`].
pub struct LocalTransport {
    rank: Rank,
    shared: Arc<Shared>,
    finalized: bool,
}

impl LocalTransport {
    fn size_inner(&self) -> usize {
        self.shared.mailboxes.len()
    }

    /// Whether a sender matching `source` can still show up.
    fn source_alive(&self, source: Source) -> bool {
        match source {
            Source::Any => self.shared.live.load(Ordering::Acquire) > 1,
            Source::Rank(r) => !self.shared.gone[r].load(Ordering::Acquire),
        }
    }

    /// Messages waiting in this endpoint's mailbox.
    pub fn pending(&self) -> usize {
        self.shared.mailboxes[self.rank].queue.lock().len()
    }
}

impl Transport for LocalTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size_inner()
    }

    fn send(&mut self, dest: Rank, tag: Tag, data: &[i32]) -> Result<()> {
        check_rank(dest, self.size_inner())?;
        let mailbox = &self.shared.mailboxes[dest];
        mailbox.queue.lock().push_back(Envelope {
            source: self.rank,
            tag,
            data: data.to_vec(),
        });
        mailbox.ready.notify_one();
        Ok(())
    }

    fn recv(&mut self, source: Source, buf: &mut [i32]) -> Result<Status> {
        if let Source::Rank(r) = source {
            check_rank(r, self.size_inner())?;
        }
        let mailbox = &self.shared.mailboxes[self.rank];
        let mut queue = mailbox.queue.lock();
        let envelope = loop {
            if let Some(pos) = queue.iter().position(|e| source.matches(e.source)) {
                match queue.remove(pos) {
                    Some(envelope) => break envelope,
                    None => continue,
                }
            }
            if !self.source_alive(source) {
                return Err(SlidewinError::Disconnected);
            }
            mailbox.ready.wait(&mut queue);
        };
        drop(queue);

        let count = envelope.data.len();
        if count > buf.len() {
            return Err(SlidewinError::Truncated {
                capacity: buf.len(),
                got: count,
            });
        }
        buf[..count].copy_from_slice(&envelope.data);
        Ok(Status {
            source: envelope.source,
            tag: envelope.tag,
            count,
        })
    }

    fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;

        let size = self.size_inner();
        let mut state = self.shared.barrier.lock();
        state.arrived += 1;
        if state.arrived == size {
            self.shared.barrier_cv.notify_all();
            return Ok(());
        }
        while state.arrived < size {
            if state.abandoned > 0 {
                return Err(SlidewinError::Disconnected);
            }
            self.shared.barrier_cv.wait(&mut state);
        }
        Ok(())
    }
}

impl Drop for LocalTransport {
    fn drop(&mut self) {
        if !self.finalized {
            self.shared.barrier.lock().abandoned += 1;
        }
        self.shared.gone[self.rank].store(true, Ordering::Release);
        self.shared.live.fetch_sub(1, Ordering::AcqRel);
        self.shared.wake_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn pair() -> (LocalTransport, LocalTransport) {
        let mut world = LocalWorld::new(2).unwrap().into_iter();
        (world.next().unwrap(), world.next().unwrap())
    }

    #[test]
    fn send_then_receive() {
        let (mut a, mut b) = pair();
        a.send(1, 0, &[1, 2, 3]).unwrap();

        let mut buf = [0i32; 4];
        let status = b.recv(Source::Rank(0), &mut buf).unwrap();
        assert_eq!(status, Status { source: 0, tag: 0, count: 3 });
        assert_eq!(buf, [1, 2, 3, 0]);
    }

    #[test]
    fn fifo_per_pair() {
        let (mut a, mut b) = pair();
        for i in 0..10 {
            a.send(1, 0, &[i]).unwrap();
        }
        let mut buf = [0i32; 1];
        for i in 0..10 {
            b.recv(Source::Any, &mut buf).unwrap();
            assert_eq!(buf[0], i);
        }
    }

    #[test]
    fn source_filter_skips_other_ranks() {
        let mut world = LocalWorld::new(3).unwrap();
        let mut c = world.pop().unwrap();
        let mut b = world.pop().unwrap();
        let mut a = world.pop().unwrap();

        b.send(0, 1, &[11]).unwrap();
        c.send(0, 2, &[22]).unwrap();

        let mut buf = [0i32; 1];
        let status = a.recv(Source::Rank(2), &mut buf).unwrap();
        assert_eq!((status.source, buf[0]), (2, 22));
        assert_eq!(a.pending(), 1);

        let status = a.recv(Source::Any, &mut buf).unwrap();
        assert_eq!((status.source, buf[0]), (1, 11));
    }

    #[test]
    fn oversized_message_is_truncation_error() {
        let (mut a, mut b) = pair();
        a.send(1, 0, &[1, 2, 3]).unwrap();
        let mut buf = [0i32; 2];
        assert!(matches!(
            b.recv(Source::Any, &mut buf),
            Err(SlidewinError::Truncated { capacity: 2, got: 3 })
        ));
    }

    #[test]
    fn invalid_destination() {
        let (mut a, _b) = pair();
        assert!(matches!(
            a.send(5, 0, &[1]),
            Err(SlidewinError::InvalidRank { rank: 5, size: 2 })
        ));
    }

    #[test]
    fn recv_blocks_until_send() {
        let (mut a, mut b) = pair();
        let handle = thread::spawn(move || {
            let mut buf = [0i32; 1];
            b.recv(Source::Rank(0), &mut buf).unwrap();
            buf[0]
        });
        thread::sleep(std::time::Duration::from_millis(20));
        a.send(1, 0, &[99]).unwrap();
        assert_eq!(handle.join().unwrap(), 99);
    }

    #[test]
    fn recv_fails_when_peers_gone() {
        let (a, mut b) = pair();
        drop(a);
        let mut buf = [0i32; 1];
        assert!(matches!(
            b.recv(Source::Any, &mut buf),
            Err(SlidewinError::Disconnected)
        ));
    }

    #[test]
    fn recv_from_dropped_rank_fails_while_others_live() {
        let mut world = LocalWorld::new(3).unwrap();
        let mut c = world.pop().unwrap();
        let b = world.pop().unwrap();
        let a = world.pop().unwrap();

        let handle = thread::spawn(move || {
            let mut buf = [0i32; 1];
            c.recv(Source::Rank(0), &mut buf)
        });
        thread::sleep(std::time::Duration::from_millis(20));
        drop(a);
        assert!(matches!(
            handle.join().unwrap(),
            Err(SlidewinError::Disconnected)
        ));
        drop(b);
    }

    #[test]
    fn queued_message_survives_sender_drop() {
        let (mut a, mut b) = pair();
        a.send(1, 0, &[5]).unwrap();
        drop(a);
        let mut buf = [0i32; 1];
        assert_eq!(b.recv(Source::Any, &mut buf).unwrap().count, 1);
        assert_eq!(buf[0], 5);
    }

    #[test]
    fn barrier_waits_for_everyone() {
        let world = LocalWorld::new(4).unwrap();
        let handles: Vec<_> = world
            .into_iter()
            .map(|mut t| thread::spawn(move || t.finalize()))
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }
    }

    #[test]
    fn barrier_fails_when_peer_abandons() {
        let (mut a, b) = pair();
        let handle = thread::spawn(move || a.finalize());
        thread::sleep(std::time::Duration::from_millis(20));
        drop(b);
        assert!(matches!(
            handle.join().unwrap(),
            Err(SlidewinError::Disconnected)
        ));
    }

    #[test]
    fn finalize_twice_is_noop() {
        let mut world = LocalWorld::new(1).unwrap();
        let mut only = world.pop().unwrap();
        only.finalize().unwrap();
        only.finalize().unwrap();
    }
}
