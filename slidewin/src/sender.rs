//! Sender (server) role.
//!
//! Serves the whole dataset to each requester, one session at a time:
//!
//! ```text
//! loop {
//!     (signal, from) = await_connect()      // any source, any tag
//!     CONNECT    -> run_session(from)       // frames 0..N/F, no ACKs
//!     DISCONNECT -> count; stop at limit
//! }
//! ```

use crate::error::{Result, SlidewinError};
use crate::params::ProtocolParams;
use crate::transport::{Rank, Source, Tag, Transport};
use slidewin_shared::ControlSignal;

/// What one serve loop did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeSummary {
    /// CONNECTs answered with a frame stream
    pub sessions: usize,
    pub frames_sent: usize,
    /// DISCONNECTs observed
    pub disconnects: usize,
}

pub struct Sender {
    params: ProtocolParams,
    dataset: Vec<i32>,
    /// DISCONNECTs to observe before the serve loop ends
    disconnect_limit: usize,
}

impl Sender {
    /// The dataset must hold exactly `params.items()` elements.
    pub fn new(params: ProtocolParams, dataset: Vec<i32>) -> Result<Self> {
        if dataset.len() != params.items() {
            return Err(SlidewinError::config(format!(
                "dataset has {} items, protocol expects {}",
                dataset.len(),
                params.items()
            )));
        }
        Ok(Self {
            params,
            dataset,
            disconnect_limit: 1,
        })
    }

    /// Keep serving until `limit` DISCONNECTs have been seen (default 1).
    pub fn with_disconnect_limit(mut self, limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(SlidewinError::config("disconnect limit must be at least 1"));
        }
        self.disconnect_limit = limit;
        Ok(self)
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn dataset(&self) -> &[i32] {
        &self.dataset
    }

    /// Block until any endpoint sends a control signal.
    pub fn await_connect<T: Transport>(&self, transport: &mut T) -> Result<(ControlSignal, Rank)> {
        let mut signal = [0i32; 1];
        let status = transport.recv(Source::Any, &mut signal)?;
        if status.count != 1 {
            return Err(SlidewinError::protocol(format!(
                "empty control message from rank {}",
                status.source
            )));
        }
        let signal = ControlSignal::try_from(signal[0]).map_err(|raw| {
            SlidewinError::protocol(format!(
                "unknown control signal {} from rank {}",
                raw, status.source
            ))
        })?;
        Ok((signal, status.source))
    }

    /// Stream every full frame to `requester`. Returns frames sent.
    pub fn run_session<T: Transport>(&self, transport: &mut T, requester: Rank) -> Result<usize> {
        let tag = transport.rank() as Tag;
        let mut frame_index = 0;
        for range in self.params.frames() {
            transport.send(requester, tag, &self.dataset[range])?;
            frame_index += 1;
        }
        Ok(frame_index)
    }

    /// Answer CONNECTs until the disconnect limit is reached.
    pub fn serve<T: Transport>(&self, transport: &mut T) -> Result<ServeSummary> {
        let mut summary = ServeSummary::default();
        while summary.disconnects < self.disconnect_limit {
            trace_info!(rank = transport.rank(), "listening for connection request");
            let (signal, requester) = self.await_connect(transport)?;
            match signal {
                ControlSignal::Connect => {
                    trace_info!(requester, "connection request received");
                    let frames = self.run_session(transport, requester)?;
                    summary.sessions += 1;
                    summary.frames_sent += frames;
                    trace_debug!(requester, frames, "session stream complete");
                }
                ControlSignal::Disconnect => {
                    summary.disconnects += 1;
                    trace_info!(
                        requester,
                        seen = summary.disconnects,
                        limit = self.disconnect_limit,
                        "disconnect received"
                    );
                }
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalWorld;
    use crate::params::dataset;

    fn sender(items: usize, frame_len: usize) -> Sender {
        let params = ProtocolParams::new(items, frame_len).unwrap();
        Sender::new(params, dataset(items)).unwrap()
    }

    #[test]
    fn dataset_length_must_match() {
        let params = ProtocolParams::new(16, 4).unwrap();
        assert!(Sender::new(params, vec![0; 15]).is_err());
    }

    #[test]
    fn zero_disconnect_limit_rejected() {
        assert!(sender(16, 4).with_disconnect_limit(0).is_err());
    }

    #[test]
    fn run_session_sends_every_frame_tagged_with_own_rank() {
        let mut world = LocalWorld::new(2).unwrap();
        let mut client = world.pop().unwrap();
        let mut server = world.pop().unwrap();

        let s = sender(16, 4);
        assert_eq!(s.run_session(&mut server, 1).unwrap(), 4);
        assert_eq!(client.pending(), 4);

        let mut buf = [0i32; 4];
        for k in 0..4 {
            let status = client.recv(Source::Rank(0), &mut buf).unwrap();
            assert_eq!(status.tag, 0);
            assert_eq!(status.count, 4);
            assert_eq!(buf[0], (k * 4) as i32);
        }
    }

    #[test]
    fn run_session_never_sends_partial_frame() {
        let mut world = LocalWorld::new(2).unwrap();
        let client = world.pop().unwrap();
        let mut server = world.pop().unwrap();

        assert_eq!(sender(10, 4).run_session(&mut server, 1).unwrap(), 2);
        assert_eq!(client.pending(), 2);
    }

    #[test]
    fn await_connect_reports_source() {
        let mut world = LocalWorld::new(2).unwrap();
        let mut client = world.pop().unwrap();
        let mut server = world.pop().unwrap();

        client.send(0, 1, &[ControlSignal::Connect.as_i32()]).unwrap();
        let (signal, from) = sender(8, 8).await_connect(&mut server).unwrap();
        assert_eq!(signal, ControlSignal::Connect);
        assert_eq!(from, 1);
    }

    #[test]
    fn await_connect_rejects_unknown_signal() {
        let mut world = LocalWorld::new(2).unwrap();
        let mut client = world.pop().unwrap();
        let mut server = world.pop().unwrap();

        client.send(0, 1, &[42]).unwrap();
        assert!(matches!(
            sender(8, 8).await_connect(&mut server),
            Err(SlidewinError::Protocol(_))
        ));
    }

    #[test]
    fn disconnect_never_triggers_frames() {
        let mut world = LocalWorld::new(2).unwrap();
        let mut client = world.pop().unwrap();
        let mut server = world.pop().unwrap();

        client.send(0, 1, &[ControlSignal::Disconnect.as_i32()]).unwrap();
        let summary = sender(8, 2).serve(&mut server).unwrap();
        assert_eq!(
            summary,
            ServeSummary {
                sessions: 0,
                frames_sent: 0,
                disconnects: 1
            }
        );
        assert_eq!(client.pending(), 0);
    }

    #[test]
    fn serve_resets_frame_counter_per_session() {
        let mut world = LocalWorld::new(2).unwrap();
        let mut client = world.pop().unwrap();
        let mut server = world.pop().unwrap();

        let connect = ControlSignal::Connect.as_i32();
        let disconnect = ControlSignal::Disconnect.as_i32();
        for signal in [connect, disconnect, connect, disconnect] {
            client.send(0, 1, &[signal]).unwrap();
        }

        let s = sender(8, 4).with_disconnect_limit(2).unwrap();
        let summary = s.serve(&mut server).unwrap();
        assert_eq!(summary.sessions, 2);
        assert_eq!(summary.frames_sent, 4);

        let mut buf = [0i32; 4];
        let firsts: Vec<i32> = (0..4)
            .map(|_| {
                client.recv(Source::Rank(0), &mut buf).unwrap();
                buf[0]
            })
            .collect();
        assert_eq!(firsts, vec![0, 4, 0, 4]);
    }
}
