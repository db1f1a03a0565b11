//! Receiver (client) role: CONNECT, drain every frame, DISCONNECT.

use crate::error::{Result, SlidewinError};
use crate::params::ProtocolParams;
use crate::transport::{Rank, Source, Tag, Transport};
use slidewin_shared::ControlSignal;

pub struct Receiver {
    params: ProtocolParams,
    sender: Rank,
}

impl Receiver {
    pub fn new(params: ProtocolParams, sender: Rank) -> Self {
        Self { params, sender }
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    /// Rank this receiver requests frames from
    pub fn sender(&self) -> Rank {
        self.sender
    }

    pub fn connect<T: Transport>(&self, transport: &mut T) -> Result<()> {
        trace_info!(rank = transport.rank(), sender = self.sender, "connection requested");
        self.signal(transport, ControlSignal::Connect)
    }

    pub fn disconnect<T: Transport>(&self, transport: &mut T) -> Result<()> {
        trace_info!(rank = transport.rank(), sender = self.sender, "disconnecting");
        self.signal(transport, ControlSignal::Disconnect)
    }

    fn signal<T: Transport>(&self, transport: &mut T, signal: ControlSignal) -> Result<()> {
        let tag = transport.rank() as Tag;
        transport.send(self.sender, tag, &[signal.as_i32()])
    }

    /// Fill `buffer` frame by frame. Returns frames received.
    ///
    /// Elements past the last full frame are left untouched.
    pub fn receive_all<T: Transport>(&self, transport: &mut T, buffer: &mut [i32]) -> Result<usize> {
        if buffer.len() != self.params.items() {
            return Err(SlidewinError::config(format!(
                "receive buffer has {} items, protocol expects {}",
                buffer.len(),
                self.params.items()
            )));
        }
        let frame_len = self.params.frame_len();
        let mut frame_index = 0;
        for range in self.params.frames() {
            let status = transport.recv(Source::Rank(self.sender), &mut buffer[range.clone()])?;
            if status.count != frame_len {
                return Err(SlidewinError::protocol(format!(
                    "frame {} carried {} elements, expected {}",
                    frame_index, status.count, frame_len
                )));
            }
            trace_debug!(
                rank = transport.rank(),
                frame = frame_index,
                values = ?&buffer[range],
                "frame received"
            );
            frame_index += 1;
        }
        Ok(frame_index)
    }

    /// One full session into a fresh zero-filled buffer.
    pub fn run<T: Transport>(&self, transport: &mut T) -> Result<Vec<i32>> {
        let mut buffer = vec![0i32; self.params.items()];
        self.connect(transport)?;
        self.receive_all(transport, &mut buffer)?;
        self.disconnect(transport)?;
        Ok(buffer)
    }
}
