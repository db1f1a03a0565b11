//! Transport recording for protocol assertions.
//!
//! ```rust,ignore
//! let log = EventLog::default();
//! let mut server = RecordingTransport::new(endpoint, log.clone());
//! // ... run the sender over `server` ...
//! let sessions = session_traces(&log.events())?;
//! ```

use slidewin::{Rank, Result, Source, Status, Tag, Transport};
use slidewin_shared::ControlSignal;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Sent { dest: Rank, tag: Tag, data: Vec<i32> },
    Received { source: Rank, tag: Tag, data: Vec<i32> },
    Finalized,
}

/// Shared, cloneable event log (survives the transport moving into a thread).
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }
}

/// Wraps any transport and logs every completed operation.
pub struct RecordingTransport<T> {
    inner: T,
    log: EventLog,
}

impl<T: Transport> RecordingTransport<T> {
    pub fn new(inner: T, log: EventLog) -> Self {
        Self { inner, log }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Transport> Transport for RecordingTransport<T> {
    fn rank(&self) -> Rank {
        self.inner.rank()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn send(&mut self, dest: Rank, tag: Tag, data: &[i32]) -> Result<()> {
        self.inner.send(dest, tag, data)?;
        self.log.push(Event::Sent {
            dest,
            tag,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn recv(&mut self, source: Source, buf: &mut [i32]) -> Result<Status> {
        let status = self.inner.recv(source, buf)?;
        self.log.push(Event::Received {
            source: status.source,
            tag: status.tag,
            data: buf[..status.count].to_vec(),
        });
        Ok(status)
    }

    fn finalize(&mut self) -> Result<()> {
        self.inner.finalize()?;
        self.log.push(Event::Finalized);
        Ok(())
    }

    fn max_message_len(&self) -> usize {
        self.inner.max_message_len()
    }
}

/// Frames the sender streamed after one CONNECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTrace {
    pub requester: Rank,
    pub frames: Vec<Vec<i32>>,
}

/// Split a sender-side log into sessions.
///
/// Fails if a frame goes out before any CONNECT, or to a rank other than the
/// one whose CONNECT opened the current session, or after a DISCONNECT.
pub fn session_traces(events: &[Event]) -> std::result::Result<Vec<SessionTrace>, String> {
    let connect = ControlSignal::Connect.as_i32();
    let disconnect = ControlSignal::Disconnect.as_i32();
    let mut sessions: Vec<SessionTrace> = Vec::new();
    let mut open = false;

    for (i, event) in events.iter().enumerate() {
        match event {
            Event::Received { source, data, .. } if data.as_slice() == [connect] => {
                sessions.push(SessionTrace {
                    requester: *source,
                    frames: Vec::new(),
                });
                open = true;
            }
            Event::Received { data, .. } if data.as_slice() == [disconnect] => {
                open = false;
            }
            Event::Received { data, .. } => {
                return Err(format!("event {}: unexpected message {:?}", i, data));
            }
            Event::Sent { dest, data, .. } => {
                let session = match sessions.last_mut() {
                    Some(s) if open => s,
                    _ => return Err(format!("event {}: frame sent outside a session", i)),
                };
                if *dest != session.requester {
                    return Err(format!(
                        "event {}: frame for rank {} during session of rank {}",
                        i, dest, session.requester
                    ));
                }
                session.frames.push(data.clone());
            }
            Event::Finalized => open = false,
        }
    }
    Ok(sessions)
}
