//! UDP transport: one process per participant.
//!
//! Each rank binds the address at its own index of a shared peer table and
//! sends datagrams straight to the peer's address:
//!
//! ```text
//! ┌──────────────┬──────────────────────────┐
//! │ PacketHeader │ count × i32 (LE)         │
//! │ 24 bytes     │                          │
//! └──────────────┴──────────────────────────┘
//! ```
//!
//! Before its first send, receive or barrier, every rank takes part in a
//! startup handshake rooted at rank 0: the others resend `Hello` until the
//! root, having heard from all of them, answers `Welcome`. No data leaves a
//! rank before every peer socket is bound.
//!
//! Every other datagram carries a per-pair sequence number. Nothing is
//! retransmitted: a gap or a bad checksum is a fatal transport error.
//! Datagrams that arrive before anyone asks for them are parked until a
//! matching receive.

use crate::error::{Result, SlidewinError};
use crate::transport::{check_rank, Rank, Source, Status, Tag, Transport};
use slidewin_shared::{payload, MessageType, PacketHeader, ELEMENT_SIZE, HEADER_SIZE};
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

/// Socket buffer size (8MB for high throughput)
const SOCKET_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Largest UDP payload over IPv4
const MAX_DATAGRAM: usize = 65507;

/// Rank that collects barrier arrivals and releases everyone
const BARRIER_ROOT: Rank = 0;

/// Interval between `Hello` resends
const HELLO_INTERVAL: Duration = Duration::from_millis(20);

/// How long a rank waits for all peers to come up
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Largest message, in elements, a single datagram can carry.
pub const MAX_MESSAGE_ELEMENTS: usize = {
    let by_datagram = (MAX_DATAGRAM - HEADER_SIZE) / ELEMENT_SIZE;
    if by_datagram < PacketHeader::MAX_COUNT {
        by_datagram
    } else {
        PacketHeader::MAX_COUNT
    }
};

struct Parked {
    source: Rank,
    tag: Tag,
    data: Vec<i32>,
}

pub struct UdpTransport {
    socket: UdpSocket,
    rank: Rank,
    peers: Vec<SocketAddr>,
    next_send_seq: Vec<u64>,
    next_recv_seq: Vec<u64>,
    /// Data messages received ahead of a matching `recv`
    parked: VecDeque<Parked>,
    /// Barrier traffic received ahead of `finalize`
    control: VecDeque<(Rank, MessageType)>,
    send_buffer: Vec<u8>,
    recv_buffer: Vec<u8>,
    /// Root: which ranks said `Hello`. Others: slot 0 marks the `Welcome`.
    greeted: Vec<bool>,
    started: bool,
    startup_timeout: Option<Duration>,
    finalized: bool,
}

impl UdpTransport {
    /// Bind `peers[rank]` and connect to the rest of the table.
    pub fn bind(rank: Rank, peers: Vec<SocketAddr>) -> Result<Self> {
        check_rank(rank, peers.len())?;
        let addr = peers[rank];

        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_send_buffer_size(SOCKET_BUFFER_SIZE)?;
        socket.set_recv_buffer_size(SOCKET_BUFFER_SIZE)?;
        socket.bind(&addr.into())?;

        Self::with_socket(rank, socket.into(), peers)
    }

    /// Use an already bound socket (its address must be `peers[rank]`).
    pub fn with_socket(rank: Rank, socket: UdpSocket, peers: Vec<SocketAddr>) -> Result<Self> {
        check_rank(rank, peers.len())?;
        socket.set_nonblocking(false)?;
        let size = peers.len();
        Ok(Self {
            socket,
            rank,
            peers,
            next_send_seq: vec![0; size],
            next_recv_seq: vec![0; size],
            parked: VecDeque::new(),
            control: VecDeque::new(),
            send_buffer: Vec::with_capacity(MAX_DATAGRAM),
            recv_buffer: vec![0u8; MAX_DATAGRAM],
            greeted: vec![false; size],
            started: false,
            startup_timeout: Some(DEFAULT_STARTUP_TIMEOUT),
            finalized: false,
        })
    }

    /// Bound the startup handshake; `None` waits for peers indefinitely.
    pub fn with_startup_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Bound local address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Run the startup handshake. Sends, receives and `finalize` call this
    /// first; once it has succeeded it is a no-op.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        let deadline = self.startup_timeout.map(|t| Instant::now() + t);
        self.socket.set_read_timeout(Some(HELLO_INTERVAL))?;
        let result = self.handshake(deadline);
        self.socket.set_read_timeout(None)?;
        result?;

        self.started = true;
        trace_debug!(rank = self.rank, peers = self.peers.len(), "all peers bound");
        Ok(())
    }

    fn handshake(&mut self, deadline: Option<Instant>) -> Result<()> {
        if self.rank == BARRIER_ROOT {
            self.greeted[BARRIER_ROOT] = true;
            while self.greeted.iter().any(|g| !g) {
                self.check_deadline(deadline)?;
                self.pump()?;
            }
            for dest in (0..self.peers.len()).filter(|&r| r != BARRIER_ROOT) {
                self.send_packet(dest, 0, MessageType::Welcome, &[])?;
            }
        } else {
            while !self.greeted[BARRIER_ROOT] {
                self.check_deadline(deadline)?;
                self.send_packet(BARRIER_ROOT, 0, MessageType::Hello, &[])?;
                self.pump()?;
            }
        }
        Ok(())
    }

    fn check_deadline(&self, deadline: Option<Instant>) -> Result<()> {
        match (deadline, self.startup_timeout) {
            (Some(deadline), Some(waited)) if Instant::now() >= deadline => {
                Err(SlidewinError::StartupTimeout {
                    rank: self.rank,
                    waited,
                })
            }
            _ => Ok(()),
        }
    }

    fn send_packet(&mut self, dest: Rank, tag: Tag, msg_type: MessageType, data: &[i32]) -> Result<()> {
        check_rank(dest, self.peers.len())?;
        if data.len() > MAX_MESSAGE_ELEMENTS {
            return Err(SlidewinError::FrameTooLarge {
                count: data.len(),
                limit: MAX_MESSAGE_ELEMENTS,
            });
        }

        let sequenced = msg_type.is_sequenced();
        let seq = if sequenced { self.next_send_seq[dest] } else { 0 };
        let body_start = HEADER_SIZE;
        self.send_buffer.clear();
        self.send_buffer.resize(HEADER_SIZE, 0);
        payload::encode_into(data, &mut self.send_buffer);

        let mut header = PacketHeader::new(self.rank as u32, seq, tag, msg_type, data.len());
        header.calculate_checksum(&self.send_buffer[body_start..]);
        self.send_buffer[..HEADER_SIZE].copy_from_slice(&header.to_bytes());

        self.socket.send_to(&self.send_buffer, self.peers[dest])?;
        if sequenced {
            self.next_send_seq[dest] = seq.wrapping_add(1);
        }
        Ok(())
    }

    /// Wait for one datagram and file it under `parked` or `control`.
    ///
    /// Returns `false` when the read timed out (only armed during startup).
    fn pump(&mut self) -> Result<bool> {
        let (len, from) = match self.socket.recv_from(&mut self.recv_buffer) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Ok(false)
            }
            // ICMP port unreachable from a peer that is not bound yet
            Err(e)
                if !self.started
                    && matches!(e.kind(), ErrorKind::ConnectionReset | ErrorKind::ConnectionRefused) =>
            {
                return Ok(false)
            }
            Err(e) => return Err(e.into()),
        };
        let malformed = |reason| SlidewinError::Malformed {
            from: from.to_string(),
            reason,
        };

        let (header, body) =
            PacketHeader::from_packet(&self.recv_buffer[..len]).ok_or_else(|| malformed("short packet"))?;
        if !header.verify_checksum(body) {
            return Err(malformed("checksum mismatch"));
        }
        let msg_type = header.message_type().ok_or_else(|| malformed("unknown message type"))?;
        let source = header.source as usize;
        if source >= self.peers.len() {
            return Err(malformed("source rank out of range"));
        }

        if msg_type.is_sequenced() {
            let expected = self.next_recv_seq[source];
            let got = header.sequence;
            if got != expected {
                return Err(SlidewinError::SequenceGap {
                    source_rank: source,
                    expected,
                    got,
                });
            }
            self.next_recv_seq[source] = expected.wrapping_add(1);
        }

        match msg_type {
            MessageType::Data => {
                let mut data = vec![0i32; header.count as usize];
                payload::decode_into(body, &mut data).ok_or_else(|| malformed("bad payload"))?;
                self.parked.push_back(Parked {
                    source,
                    tag: header.tag,
                    data,
                });
            }
            MessageType::Barrier | MessageType::Release => {
                self.control.push_back((source, msg_type));
            }
            MessageType::Hello if self.rank == BARRIER_ROOT => {
                self.greeted[source] = true;
                // Our earlier Welcome was lost; the peer is still asking.
                if self.started {
                    self.send_packet(source, 0, MessageType::Welcome, &[])?;
                }
            }
            MessageType::Welcome if source == BARRIER_ROOT => {
                self.greeted[BARRIER_ROOT] = true;
            }
            MessageType::Hello | MessageType::Welcome => {
                return Err(malformed("startup datagram for the wrong rank"));
            }
        }
        Ok(true)
    }

    fn take_parked(&mut self, source: Source) -> Option<Parked> {
        let pos = self.parked.iter().position(|p| source.matches(p.source))?;
        self.parked.remove(pos)
    }

    fn wait_control(&mut self, msg_type: MessageType) -> Result<Rank> {
        loop {
            if let Some(pos) = self.control.iter().position(|(_, t)| *t == msg_type) {
                if let Some((source, _)) = self.control.remove(pos) {
                    return Ok(source);
                }
            }
            self.pump()?;
        }
    }
}

impl Transport for UdpTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn send(&mut self, dest: Rank, tag: Tag, data: &[i32]) -> Result<()> {
        self.start()?;
        self.send_packet(dest, tag, MessageType::Data, data)
    }

    fn recv(&mut self, source: Source, buf: &mut [i32]) -> Result<Status> {
        if let Source::Rank(r) = source {
            check_rank(r, self.peers.len())?;
        }
        self.start()?;
        let message = loop {
            if let Some(message) = self.take_parked(source) {
                break message;
            }
            self.pump()?;
        };

        let count = message.data.len();
        if count > buf.len() {
            return Err(SlidewinError::Truncated {
                capacity: buf.len(),
                got: count,
            });
        }
        buf[..count].copy_from_slice(&message.data);
        Ok(Status {
            source: message.source,
            tag: message.tag,
            count,
        })
    }

    fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        self.start()?;
        let size = self.peers.len();
        if self.rank == BARRIER_ROOT {
            let mut arrived = vec![false; size];
            arrived[BARRIER_ROOT] = true;
            while arrived.iter().any(|a| !a) {
                let source = self.wait_control(MessageType::Barrier)?;
                arrived[source] = true;
            }
            for dest in (0..size).filter(|&r| r != BARRIER_ROOT) {
                self.send_packet(dest, 0, MessageType::Release, &[])?;
            }
        } else {
            self.send_packet(BARRIER_ROOT, 0, MessageType::Barrier, &[])?;
            self.wait_control(MessageType::Release)?;
        }
        self.finalized = true;
        Ok(())
    }

    fn max_message_len(&self) -> usize {
        MAX_MESSAGE_ELEMENTS
    }
}
